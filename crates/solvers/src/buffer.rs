use std::{ffi::c_void, fmt};

use spiral_core::Precision;

/// Where a buffer's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Host,
    Device,
}

/// Scalar type of a buffer's elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    F32,
    F64,
}

impl Element {
    #[must_use]
    pub fn of(precision: Precision) -> Self {
        match precision {
            Precision::Double => Element::F64,
            Precision::Single => Element::F32,
        }
    }
}

/// A buffer that can be handed to a generated function.
///
/// Only metadata is read while checking a call; [`Buffer::as_raw`] is called
/// once every check has passed.
pub trait Buffer {
    fn domain(&self) -> Domain;

    fn element(&self) -> Element;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an untyped pointer to the first element.
    ///
    /// The pointer is mutable because the generated ABI takes untyped
    /// mutable pointers for every operand. Generated functions only write
    /// through the destination.
    fn as_raw(&self) -> *mut c_void;

    /// Returns whether [`Buffer::divide`] can scale this buffer.
    fn can_divide(&self) -> bool {
        true
    }

    /// Divides every element by `divisor` in place.
    fn divide(&mut self, divisor: usize);
}

macro_rules! host_buffer {
    ($ty:ty, $element:expr) => {
        impl Buffer for [$ty] {
            fn domain(&self) -> Domain {
                Domain::Host
            }

            fn element(&self) -> Element {
                $element
            }

            fn len(&self) -> usize {
                <[$ty]>::len(self)
            }

            fn as_raw(&self) -> *mut c_void {
                self.as_ptr().cast_mut().cast()
            }

            #[allow(clippy::cast_precision_loss)]
            fn divide(&mut self, divisor: usize) {
                let divisor = divisor as $ty;
                self.iter_mut().for_each(|x| *x /= divisor);
            }
        }

        impl Buffer for Vec<$ty> {
            fn domain(&self) -> Domain {
                Domain::Host
            }

            fn element(&self) -> Element {
                $element
            }

            fn len(&self) -> usize {
                self.as_slice().len()
            }

            fn as_raw(&self) -> *mut c_void {
                self.as_slice().as_raw()
            }

            fn divide(&mut self, divisor: usize) {
                self.as_mut_slice().divide(divisor);
            }
        }
    };
}

host_buffer!(f64, Element::F64);
host_buffer!(f32, Element::F32);

/// Scales `len` elements of type `element` at `ptr` by `1 / divisor` on the device.
///
/// # Safety
///
/// Called only with the pointer, element type, and length of a
/// [`DeviceBuffer`], which guarantees they describe one live allocation.
pub type DeviceScale = unsafe fn(ptr: *mut c_void, element: Element, len: usize, divisor: usize);

/// A buffer in device memory, described by an opaque pointer.
///
/// Device memory cannot be touched from the host, so normalizing results
/// requires a [`DeviceScale`] hook supplied by the caller's GPU runtime.
pub struct DeviceBuffer {
    ptr: *mut c_void,
    element: Element,
    len: usize,
    scale: Option<DeviceScale>,
}

impl DeviceBuffer {
    /// Wraps a device allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a device allocation holding at least `len`
    /// elements of type `element`, and must stay valid for as long as the
    /// returned value is used.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut c_void, element: Element, len: usize) -> Self {
        Self {
            ptr,
            element,
            len,
            scale: None,
        }
    }

    /// Sets the hook used to normalize results in place.
    #[must_use]
    pub fn with_scale(mut self, scale: DeviceScale) -> Self {
        self.scale = Some(scale);
        self
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr)
            .field("element", &self.element)
            .field("len", &self.len)
            .field("scale", &self.scale.is_some())
            .finish()
    }
}

impl Buffer for DeviceBuffer {
    fn domain(&self) -> Domain {
        Domain::Device
    }

    fn element(&self) -> Element {
        self.element
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_raw(&self) -> *mut c_void {
        self.ptr
    }

    fn can_divide(&self) -> bool {
        self.scale.is_some()
    }

    fn divide(&mut self, divisor: usize) {
        match self.scale {
            // SAFETY: `from_raw` guarantees the pointer, type, and length.
            Some(scale) => unsafe { scale(self.ptr, self.element, self.len, divisor) },
            None => log::warn!("device buffer has no scale hook; result left unnormalized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn host_buffers_describe_themselves() {
        let doubles = vec![1.0_f64; 8];
        let singles = [1.0_f32; 3];

        assert_eq!(doubles.domain(), Domain::Host);
        assert_eq!(doubles.element(), Element::F64);
        assert_eq!(Buffer::len(&doubles), 8);
        assert_eq!(singles[..].element(), Element::F32);
        assert_eq!(Buffer::len(&singles[..]), 3);
        assert_eq!(doubles.as_raw(), doubles.as_ptr().cast_mut().cast());
    }

    #[test]
    fn host_divide_scales_in_place() {
        let mut values = vec![64.0, 128.0, -32.0];
        values.divide(64);

        assert_relative_eq!(values[0], 1.0);
        assert_relative_eq!(values[1], 2.0);
        assert_relative_eq!(values[2], -0.5);
    }

    #[test]
    fn device_divide_goes_through_hook() {
        unsafe fn divide_host_memory(ptr: *mut c_void, element: Element, len: usize, divisor: usize) {
            assert_eq!(element, Element::F64);
            let values = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<f64>(), len) };
            values.iter_mut().for_each(|x| *x /= divisor as f64);
        }

        let mut storage = vec![8.0_f64, 4.0];
        let mut device =
            unsafe { DeviceBuffer::from_raw(storage.as_mut_ptr().cast(), Element::F64, 2) };
        assert!(!device.can_divide());

        device = device.with_scale(divide_host_memory);
        assert!(device.can_divide());
        device.divide(2);

        assert_eq!(storage, vec![4.0, 2.0]);
    }

    #[test]
    fn precision_maps_to_element() {
        assert_eq!(Element::of(Precision::Double), Element::F64);
        assert_eq!(Element::of(Precision::Single), Element::F32);
    }
}
