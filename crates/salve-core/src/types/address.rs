//! Program-counter address type.

use std::ffi::c_void;
use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed code address
///
/// Wraps the raw `u64` value of a program counter or return address so that
/// frame addresses are never confused with sizes, counts or offsets.
///
/// ## Example
///
/// ```rust
/// use salve_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x100;
/// assert_eq!(next_addr.value(), 0x1100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    ///
    /// Never a valid frame. Unwinding stops when it is reached.
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value
    ///
    /// ## Example
    ///
    /// ```rust
    /// use salve_core::types::Address;
    ///
    /// const PROBE: Address = Address::new(0x7fff00000000);
    /// assert_eq!(PROBE.value(), 0x7fff00000000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Build an address from a raw code pointer handed out by the unwinder.
    pub fn from_ptr(ptr: *mut c_void) -> Self
    {
        Address(ptr as usize as u64)
    }

    /// Address of a function item, used as an unwinding anchor or probe.
    pub fn of_fn(addr: usize) -> Self
    {
        Address(addr as u64)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Whether this is the null address.
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// Subtract an offset from this address, checking for underflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use salve_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_sub(0x100), Some(Address::from(0xf00)));
    /// assert_eq!(addr.checked_sub(u64::MAX), None);
    /// ```
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Address to hand to a symbol lookup for a return address.
    ///
    /// A return address points at the instruction after the call, which may
    /// already belong to the next line or even the next function. Looking up
    /// one byte earlier lands inside the call instruction itself.
    pub fn call_site(self) -> Self
    {
        self.checked_sub(1).unwrap_or(Address::ZERO)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
