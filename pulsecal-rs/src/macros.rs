/// Construct a complex number with the provided real component.
#[macro_export]
macro_rules! real {
    ($value:expr) => {{
        num_complex::Complex64::new($value, 0f64)
    }};
}

/// Construct a complex number with the provided imaginary component.
#[macro_export]
macro_rules! imag {
    ($value:expr) => {{
        num_complex::Complex64::new(0f64, $value)
    }};
}
