//! Build flavor queries.

/// Compiled with debug assertions (the `dev` profile by default).
pub const fn is_debug() -> bool
{
    cfg!(debug_assertions)
}

/// Compiled without debug assertions.
pub const fn is_release() -> bool
{
    !is_debug()
}

/// Whether `salve_assert!` and `salve_assert_op!` check their conditions.
pub const fn is_asserting() -> bool
{
    cfg!(debug_assertions)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_flavors_are_exclusive()
    {
        assert_ne!(is_debug(), is_release());
        assert_eq!(is_asserting(), is_debug());
    }
}
