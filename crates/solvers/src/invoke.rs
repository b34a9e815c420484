//! Checked invocation of a generated main function.
//!
//! Every rule is checked against buffer metadata before any buffer pointer is
//! taken, so a rejected call never touches memory:
//!
//! - the symbol operand is present exactly when the function takes one
//! - all buffers share one [`Domain`]
//! - host buffers are used with CPU code, device buffers with GPU code
//! - every buffer holds elements of the configured precision
//! - every buffer is long enough for the transform
//! - a destination that must be normalized can be

use std::ptr;

use spiral_core::{Operands, Options, Platform, Transform};
use thiserror::Error;

use crate::{
    buffer::{Buffer, Domain, Element},
    library::ExecFn,
};

/// Errors that can occur while checking a call to a generated function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("buffers must share one memory domain (dst: {dst:?}, {operand}: {found:?})")]
    DomainMismatch {
        dst: Domain,
        operand: &'static str,
        found: Domain,
    },

    #[error("CPU function requires host buffers")]
    CpuRequiresHost,

    #[error("GPU function requires device buffers")]
    GpuRequiresDevice,

    #[error("{operand} holds {found:?} elements, expected {expected:?}")]
    ElementMismatch {
        operand: &'static str,
        expected: Element,
        found: Element,
    },

    #[error("{operand} holds {len} elements, at least {required} required")]
    TooShort {
        operand: &'static str,
        len: usize,
        required: usize,
    },

    #[error("function takes a symbol buffer but none was given")]
    MissingSymbol,

    #[error("function takes no symbol buffer")]
    UnexpectedSymbol,

    #[error("destination cannot be normalized in place")]
    CannotNormalize,
}

/// Validates and dispatches calls for one transform under one set of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    platform: Platform,
    element: Element,
    operands: Operands,
    output_len: usize,
    input_len: usize,
    symbol_len: Option<usize>,
    normalization: Option<usize>,
}

impl Invoker {
    #[must_use]
    pub fn new<T: Transform>(transform: &T, options: &Options) -> Self {
        Self {
            platform: options.platform,
            element: Element::of(options.precision),
            operands: transform.operands(),
            output_len: transform.output_len(),
            input_len: transform.input_len(),
            symbol_len: transform.symbol_len(),
            normalization: transform.normalization(),
        }
    }

    #[must_use]
    pub fn normalization(&self) -> Option<usize> {
        self.normalization
    }

    /// Checks a call without touching any buffer's storage.
    ///
    /// Returns the domain shared by all buffers.
    ///
    /// # Errors
    ///
    /// Returns the first rule the call breaks.
    pub fn check<D, S>(&self, dst: &D, src: &S, sym: Option<&S>) -> Result<Domain, InvokeError>
    where
        D: Buffer + ?Sized,
        S: Buffer + ?Sized,
    {
        match (self.operands, sym.is_some()) {
            (Operands::SourceAndSymbol, false) => return Err(InvokeError::MissingSymbol),
            (Operands::Source, true) => return Err(InvokeError::UnexpectedSymbol),
            _ => {}
        }

        let domain = dst.domain();
        let mut operands: Vec<(&'static str, Domain, Element, usize, usize)> = vec![
            ("dst", domain, dst.element(), dst.len(), self.output_len),
            ("src", src.domain(), src.element(), src.len(), self.input_len),
        ];
        if let Some(sym) = sym {
            let required = self.symbol_len.unwrap_or(0);
            operands.push(("sym", sym.domain(), sym.element(), sym.len(), required));
        }

        for &(operand, found, ..) in &operands {
            if found != domain {
                return Err(InvokeError::DomainMismatch {
                    dst: domain,
                    operand,
                    found,
                });
            }
        }

        match (domain, self.platform.is_gpu()) {
            (Domain::Device, false) => return Err(InvokeError::CpuRequiresHost),
            (Domain::Host, true) => return Err(InvokeError::GpuRequiresDevice),
            _ => {}
        }

        for &(operand, _, found, len, required) in &operands {
            if found != self.element {
                return Err(InvokeError::ElementMismatch {
                    operand,
                    expected: self.element,
                    found,
                });
            }
            if len < required {
                return Err(InvokeError::TooShort {
                    operand,
                    len,
                    required,
                });
            }
        }

        if self.normalization.is_some() && !dst.can_divide() {
            return Err(InvokeError::CannotNormalize);
        }

        Ok(domain)
    }

    /// Checks a call, runs `exec`, and normalizes the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the call breaks any rule; `exec` is not run then.
    ///
    /// # Safety
    ///
    /// `exec` must come from a library that is still loaded and was generated
    /// for the transform this invoker describes.
    pub unsafe fn invoke<D, S>(
        &self,
        exec: ExecFn,
        dst: &mut D,
        src: &S,
        sym: Option<&S>,
    ) -> Result<(), InvokeError>
    where
        D: Buffer + ?Sized,
        S: Buffer + ?Sized,
    {
        self.check(dst, src, sym)?;

        let sym = sym.map_or(ptr::null_mut(), |sym| sym.as_raw());
        // SAFETY: lengths, element types, and domains were checked above.
        unsafe { exec.call(dst.as_raw(), src.as_raw(), sym) };

        if let Some(divisor) = self.normalization {
            dst.divide(divisor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::Cell, ffi::c_void};

    use approx::assert_relative_eq;
    use spiral_core::{Precision, transforms::Mdrconv};

    use crate::buffer::DeviceBuffer;

    /// A buffer that records any access to its storage.
    struct Tracked {
        domain: Domain,
        len: usize,
        touched: Cell<bool>,
    }

    impl Tracked {
        fn new(domain: Domain, len: usize) -> Self {
            Self {
                domain,
                len,
                touched: Cell::new(false),
            }
        }
    }

    impl Buffer for Tracked {
        fn domain(&self) -> Domain {
            self.domain
        }

        fn element(&self) -> Element {
            Element::F64
        }

        fn len(&self) -> usize {
            self.len
        }

        fn as_raw(&self) -> *mut c_void {
            self.touched.set(true);
            ptr::null_mut()
        }

        fn divide(&mut self, _divisor: usize) {
            self.touched.set(true);
        }
    }

    fn conv() -> Mdrconv {
        Mdrconv::new([4, 4, 4]).unwrap()
    }

    unsafe extern "C" fn never_called(_: *mut c_void, _: *mut c_void, _: *mut c_void) {
        panic!("generated function must not run");
    }

    /// Writes `64 * (i + 1)` into element `i` of a 4x4x4 destination.
    unsafe extern "C" fn unnormalized(dst: *mut c_void, _src: *mut c_void, _sym: *mut c_void) {
        let dst = unsafe { std::slice::from_raw_parts_mut(dst.cast::<f64>(), 64) };
        for (i, x) in dst.iter_mut().enumerate() {
            *x = 64.0 * (i + 1) as f64;
        }
    }

    #[test]
    fn mixed_domains_are_rejected_without_access() {
        let invoker = Invoker::new(&conv(), &Options::default());
        let mut dst = Tracked::new(Domain::Host, 64);
        let src = Tracked::new(Domain::Device, 64);
        let sym = Tracked::new(Domain::Device, 96);

        let err = unsafe {
            invoker.invoke(ExecFn::SourceAndSymbol(never_called), &mut dst, &src, Some(&sym))
        }
        .unwrap_err();

        assert_eq!(
            err,
            InvokeError::DomainMismatch {
                dst: Domain::Host,
                operand: "src",
                found: Domain::Device,
            }
        );
        assert!(!dst.touched.get());
        assert!(!src.touched.get());
        assert!(!sym.touched.get());
    }

    #[test]
    fn device_buffers_need_gpu_code() {
        let invoker = Invoker::new(&conv(), &Options::default());
        let dst = Tracked::new(Domain::Device, 64);
        let src = Tracked::new(Domain::Device, 64);

        let err = invoker.check(&dst, &src, Some(&src)).unwrap_err();

        assert_eq!(err, InvokeError::CpuRequiresHost);
    }

    #[test]
    fn host_buffers_need_cpu_code() {
        let options = Options {
            platform: Platform::Cuda,
            ..Options::default()
        };
        let invoker = Invoker::new(&conv(), &options);
        let dst = vec![0.0; 64];
        let src = vec![0.0; 96];

        let err = invoker.check(&dst, &src, Some(&src)).unwrap_err();

        assert_eq!(err, InvokeError::GpuRequiresDevice);
    }

    #[test]
    fn symbol_presence_matches_arity() {
        let invoker = Invoker::new(&conv(), &Options::default());
        let dst = vec![0.0; 64];
        let src = vec![0.0; 64];

        assert_eq!(
            invoker.check(&dst, &src, None).unwrap_err(),
            InvokeError::MissingSymbol
        );
    }

    #[test]
    fn precision_and_length_are_checked() {
        let single = Options {
            precision: Precision::Single,
            ..Options::default()
        };
        let invoker = Invoker::new(&conv(), &single);
        let dst = vec![0.0_f64; 64];
        let src = vec![0.0_f64; 96];
        assert_eq!(
            invoker.check(&dst, &src, Some(&src)).unwrap_err(),
            InvokeError::ElementMismatch {
                operand: "dst",
                expected: Element::F32,
                found: Element::F64,
            }
        );

        let invoker = Invoker::new(&conv(), &Options::default());
        let src = vec![0.0_f64; 64];
        let sym = vec![0.0_f64; 95];
        assert_eq!(
            invoker.check(&dst, &src, Some(&sym)).unwrap_err(),
            InvokeError::TooShort {
                operand: "sym",
                len: 95,
                required: 96,
            }
        );
    }

    #[test]
    fn device_destination_without_scale_cannot_be_normalized() {
        let options = Options {
            platform: Platform::Hip,
            ..Options::default()
        };
        let invoker = Invoker::new(&conv(), &options);
        let mut storage = [0.0_f64; 96];
        let raw: *mut c_void = storage.as_mut_ptr().cast();
        let dst = unsafe { DeviceBuffer::from_raw(raw, Element::F64, 64) };
        let src = unsafe { DeviceBuffer::from_raw(raw, Element::F64, 96) };

        assert_eq!(
            invoker.check(&dst, &src, Some(&src)).unwrap_err(),
            InvokeError::CannotNormalize
        );
    }

    #[test]
    fn results_are_divided_by_transform_size() {
        let invoker = Invoker::new(&conv(), &Options::default());
        let mut dst = vec![0.0_f64; 64];
        let src = vec![1.0_f64; 64];
        let sym = vec![1.0_f64; 96];

        unsafe { invoker.invoke(ExecFn::SourceAndSymbol(unnormalized), &mut dst, &src, Some(&sym)) }
            .expect("call should pass every check");

        assert_eq!(invoker.normalization(), Some(64));
        for (i, x) in dst.iter().enumerate() {
            assert_relative_eq!(*x, 64.0 * (i + 1) as f64 / 64.0);
        }
    }
}
