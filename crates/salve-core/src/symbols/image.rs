//! Binary image parsing and DWARF section loading.

use std::borrow::Cow;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, SymbolKind};
use tracing::debug;

use super::demangle::make_symbol_name;
use super::OwnedReader;
use crate::error::{SalveError, SalveResult};
use crate::types::{Address, SourceLocation, Symbol};

/// Describes a module mapped into this process.
#[derive(Debug, Clone)]
pub struct ImageDescriptor
{
    pub path: PathBuf,
    /// Runtime address the module's first loadable segment was mapped at.
    pub load_address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(u64);

impl ImageId
{
    pub fn from_parts(path: &Path, load_address: u64) -> Self
    {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        load_address.hash(&mut hasher);
        ImageId(hasher.finish())
    }
}

fn load_section(file: &object::File<'_>, id: SectionId, endian: RunTimeEndian) -> SalveResult<OwnedReader>
{
    let Some(section) = file.section_by_name(id.name()) else {
        return Ok(EndianArcSlice::new(Arc::<[u8]>::from(Vec::new()), endian));
    };
    let data = section.uncompressed_data().map_err(|err| SalveError::Section {
        section: id.name().to_string(),
        reason: err.to_string(),
    })?;
    let bytes = match data {
        Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
        Cow::Owned(vec) => vec.into(),
    };
    Ok(EndianArcSlice::new(bytes, endian))
}

/// A function symbol from the object's symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SymtabEntry
{
    address: u64,
    /// Zero when the format does not record sizes (Mach-O).
    size: u64,
    name: String,
}

impl SymtabEntry
{
    fn contains(&self, file_addr: u64) -> bool
    {
        file_addr >= self.address && (self.size == 0 || file_addr - self.address < self.size)
    }
}

/// A loaded module: line tables when the module carries DWARF, its symbol
/// table otherwise.
pub struct BinaryImage
{
    path: PathBuf,
    slide: i64,
    context: Option<Context<OwnedReader>>,
    /// Sorted by address.
    symbols: Vec<SymtabEntry>,
}

impl BinaryImage
{
    pub(crate) fn parse(desc: ImageDescriptor) -> SalveResult<Self>
    {
        let bytes = fs::read(&desc.path)?;
        let data = Arc::<[u8]>::from(bytes);
        let file = object::File::parse(&*data).map_err(|err| SalveError::ObjectParse {
            path: desc.path.clone(),
            reason: err.to_string(),
        })?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        // the loader maps the lowest file-backed segment at the reported base
        let base_vmaddr = file
            .segments()
            .filter(|segment| segment.file_range().1 > 0)
            .map(|segment| segment.address())
            .min()
            .ok_or_else(|| SalveError::NoLoadableSegment(desc.path.clone()))?;
        let slide = (desc.load_address as i64).wrapping_sub(base_vmaddr as i64);

        let has_dwarf = file.section_by_name(SectionId::DebugInfo.name()).is_some_and(|info| info.size() > 0);
        let context = if has_dwarf {
            match build_context(&file, endian) {
                Ok(context) => Some(context),
                Err(err) => {
                    debug!(path = %desc.path.display(), error = %err, "ignoring unusable DWARF");
                    None
                }
            }
        } else {
            None
        };

        let symbols = collect_symbols(&file);
        debug!(
            path = %desc.path.display(),
            slide,
            dwarf = context.is_some(),
            symbols = symbols.len(),
            "loaded image"
        );

        Ok(Self {
            path: desc.path,
            slide,
            context,
            symbols,
        })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Whether line tables were found.
    pub fn has_debug_info(&self) -> bool
    {
        self.context.is_some()
    }

    /// Translate a runtime address into the address space of the file.
    pub fn file_address(&self, address: Address) -> u64
    {
        (address.value() as i64).wrapping_sub(self.slide) as u64
    }

    /// Look up the function containing `address`, innermost inlined call
    /// first, with the symbol table as fallback.
    pub fn symbolicate(&self, address: Address) -> Option<Symbol>
    {
        let file_addr = self.file_address(address);

        if let Some(symbol) = self.symbolicate_dwarf(file_addr) {
            return Some(symbol);
        }

        let raw = self.symtab_name(file_addr)?;
        let location = self.context.as_ref().and_then(|ctx| {
            ctx.find_location(file_addr)
                .ok()
                .flatten()
                .and_then(|loc| loc.file.map(|file| location_of(file, loc.line, loc.column)))
        });
        Some(Symbol::new(make_symbol_name(raw.to_string()), location))
    }

    fn symbolicate_dwarf(&self, file_addr: u64) -> Option<Symbol>
    {
        let ctx = self.context.as_ref()?;
        let mut frame_iter = ctx.find_frames(file_addr).skip_all_loads().ok()?;

        while let Ok(Some(frame)) = frame_iter.next() {
            let Some(raw) = frame.function.as_ref().and_then(|func| func.raw_name().ok()) else {
                continue;
            };
            let location = frame
                .location
                .and_then(|loc| loc.file.map(|file| location_of(file, loc.line, loc.column)));
            return Some(Symbol::new(make_symbol_name(raw.to_string()), location));
        }

        None
    }

    fn symtab_name(&self, file_addr: u64) -> Option<&str>
    {
        let idx = self.symbols.partition_point(|entry| entry.address <= file_addr);
        let entry = &self.symbols[idx.checked_sub(1)?];
        entry.contains(file_addr).then_some(entry.name.as_str())
    }
}

fn build_context(file: &object::File<'_>, endian: RunTimeEndian) -> SalveResult<Context<OwnedReader>>
{
    let dwarf = Dwarf::load(|id| load_section(file, id, endian))?;

    Context::from_dwarf(dwarf).map_err(|source| SalveError::Dwarf {
        context: "building the line table context",
        source,
    })
}

/// Defined function symbols, falling back to the dynamic table for stripped
/// modules.
fn collect_symbols(file: &object::File<'_>) -> Vec<SymtabEntry>
{
    let mut entries = function_symbols(file.symbols());
    if entries.is_empty() {
        entries = function_symbols(file.dynamic_symbols());
    }
    entries.sort_by_key(|entry| entry.address);
    entries.dedup_by_key(|entry| entry.address);
    entries
}

fn function_symbols(symbols: object::SymbolIterator<'_, '_>) -> Vec<SymtabEntry>
{
    symbols
        .filter(|symbol| symbol.kind() == SymbolKind::Text && symbol.is_definition())
        .filter_map(|symbol| {
            let name = symbol.name().ok().filter(|name| !name.is_empty())?;
            Some(SymtabEntry {
                address: symbol.address(),
                size: symbol.size(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn location_of(file: &str, line: Option<u32>, column: Option<u32>) -> SourceLocation
{
    SourceLocation {
        file: file.to_string(),
        line,
        column,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_image_id_depends_on_base()
    {
        let path = Path::new("/usr/lib/libfoo.so");
        assert_eq!(ImageId::from_parts(path, 0x1000), ImageId::from_parts(path, 0x1000));
        assert_ne!(ImageId::from_parts(path, 0x1000), ImageId::from_parts(path, 0x2000));
    }

    fn image_with_symbols(symbols: Vec<SymtabEntry>) -> BinaryImage
    {
        BinaryImage {
            path: PathBuf::from("/test/image"),
            slide: 0,
            context: None,
            symbols,
        }
    }

    fn entry(address: u64, size: u64, name: &str) -> SymtabEntry
    {
        SymtabEntry {
            address,
            size,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_symtab_respects_symbol_size()
    {
        let image = image_with_symbols(vec![entry(0x1000, 0x20, "first"), entry(0x1040, 0x10, "second")]);

        assert_eq!(image.symtab_name(0x0fff), None);
        assert_eq!(image.symtab_name(0x1000), Some("first"));
        assert_eq!(image.symtab_name(0x101f), Some("first"));
        // padding between the two functions
        assert_eq!(image.symtab_name(0x1020), None);
        assert_eq!(image.symtab_name(0x103f), None);
        assert_eq!(image.symtab_name(0x1048), Some("second"));
        assert_eq!(image.symtab_name(0x1050), None);
        assert!(image.symbolicate(Address::new(0x1030)).is_none());
    }

    #[test]
    fn test_symtab_unsized_symbol_extends_to_next()
    {
        let image = image_with_symbols(vec![entry(0x1000, 0, "unsized"), entry(0x2000, 0x10, "sized")]);

        assert_eq!(image.symtab_name(0x1fff), Some("unsized"));
        assert_eq!(image.symtab_name(0x2008), Some("sized"));
    }

    #[test]
    fn test_parse_missing_file_is_io_error()
    {
        let err = BinaryImage::parse(ImageDescriptor {
            path: PathBuf::from("/nonexistent/salve/image"),
            load_address: 0,
        })
        .err()
        .expect("missing file must not parse");
        assert!(matches!(err, SalveError::Io(_)));
    }

    #[test]
    fn test_parse_garbage_is_object_error()
    {
        let dir = std::env::temp_dir().join(format!("salve-image-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("garbage.bin");
        fs::write(&path, b"definitely not an object file").unwrap();

        let err = BinaryImage::parse(ImageDescriptor {
            path: path.clone(),
            load_address: 0,
        })
        .err()
        .expect("garbage must not parse");
        assert!(matches!(err, SalveError::ObjectParse { .. }));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_parse_current_executable()
    {
        let exe = std::env::current_exe().unwrap();
        let image = BinaryImage::parse(ImageDescriptor {
            path: exe.clone(),
            load_address: 0,
        })
        .unwrap();
        assert_eq!(image.path(), exe.as_path());
    }
}
