//! # Symbol Cache
//!
//! [`ImageSymbols`] is the symbol source used for the running process. For
//! every address it asks the dynamic loader which module holds it, loads that
//! module's file once, and answers from its line tables or symbol table.
//!
//! A module whose file cannot be read or parsed is remembered as unusable and
//! never retried. Lookups in it fall back to the name the loader itself
//! reports, if any.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use salve_core::symbols::{ImageSymbols, SymbolSource};
//! use salve_core::types::Address;
//!
//! let mut symbols = ImageSymbols::new();
//! if let Some(symbol) = symbols.lookup(Address::from(0x5555_5555_1000)) {
//!     println!("{symbol}");
//! }
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use super::demangle::make_symbol_name;
use super::image::{BinaryImage, ImageDescriptor, ImageId};
use super::module::{module_for_address, ModuleInfo};
use super::SymbolSource;
use crate::types::{Address, Symbol};

/// Cache of the modules loaded into this process.
///
/// Not thread-safe on its own; the resolver session serialises access.
#[derive(Default)]
pub struct ImageSymbols
{
    images: HashMap<ImageId, Option<BinaryImage>>,
}

impl ImageSymbols
{
    pub fn new() -> Self
    {
        Self { images: HashMap::new() }
    }

    /// Number of modules looked at so far, usable or not.
    pub fn image_count(&self) -> usize
    {
        self.images.len()
    }

    /// Number of modules whose line tables were loaded.
    pub fn debug_image_count(&self) -> usize
    {
        self.images
            .values()
            .filter(|image| image.as_ref().is_some_and(BinaryImage::has_debug_info))
            .count()
    }

    fn image_for(&mut self, module: &ModuleInfo) -> Option<&BinaryImage>
    {
        let id = ImageId::from_parts(&module.path, module.base.value());
        self.images
            .entry(id)
            .or_insert_with(|| {
                let descriptor = ImageDescriptor {
                    path: module.path.clone(),
                    load_address: module.base.value(),
                };
                match BinaryImage::parse(descriptor) {
                    Ok(image) => Some(image),
                    Err(err) => {
                        warn!(path = %module.path.display(), error = %err, "cannot load symbols for module");
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl SymbolSource for ImageSymbols
{
    fn lookup(&mut self, address: Address) -> Option<Symbol>
    {
        let Some(module) = module_for_address(address) else {
            debug!(%address, "address is not in any loaded module");
            return None;
        };

        self.image_for(&module)
            .and_then(|image| image.symbolicate(address))
            .or_else(|| module.symbol.map(|raw| Symbol::new(make_symbol_name(raw), None)))
    }
}
