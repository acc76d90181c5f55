//! Symbol and source location types.

use std::fmt;

/// Programming language associated with a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolLanguage
{
    /// Rust symbol (detected via mangling or namespace patterns).
    Rust,
    /// C++ symbol (Itanium mangling without Rust extensions).
    Cpp,
    /// C symbol or unmangled global.
    C,
    /// Unknown or mixed language.
    Unknown,
}

impl fmt::Display for SymbolLanguage
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            SymbolLanguage::Rust => "rust",
            SymbolLanguage::Cpp => "c++",
            SymbolLanguage::C => "c",
            SymbolLanguage::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

/// A function name with demangling metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
    language: SymbolLanguage,
}

impl SymbolName
{
    /// Construct from a raw linkage name.
    pub fn new(raw: String, demangled: Option<String>, language: SymbolLanguage) -> Self
    {
        Self {
            raw,
            demangled,
            language,
        }
    }

    /// Raw (mangled) name emitted in the object file.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    /// Demangled human-friendly name if available.
    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }

    /// Preferred presentation (demangled fallback to raw).
    pub fn display_name(&self) -> &str
    {
        self.demangled.as_deref().unwrap_or(&self.raw)
    }

    /// Language classification for the symbol.
    pub fn language(&self) -> SymbolLanguage
    {
        self.language
    }
}

impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}

/// Source code location for a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation
{
    /// Path as recorded in the debug information.
    pub file: String,
    /// Line number, if known.
    pub line: Option<u32>,
    /// Column number, if known.
    pub column: Option<u32>,
}

impl SourceLocation
{
    /// Helper to build a location when only a file is known.
    pub fn from_file(file: impl Into<String>) -> Self
    {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }
}

/// Best-effort answer for one code address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol
{
    /// Enclosing function.
    pub name: SymbolName,
    /// Source position, when line tables were available.
    pub location: Option<SourceLocation>,
}

impl Symbol
{
    pub fn new(name: SymbolName, location: Option<SourceLocation>) -> Self
    {
        Self { name, location }
    }
}

impl fmt::Display for Symbol
{
    /// `name`, or `name (file, line N)` when the line is known.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.location {
            Some(SourceLocation {
                file, line: Some(line), ..
            }) => write!(f, "{} ({file}, line {line})", self.name),
            Some(SourceLocation { file, line: None, .. }) => write!(f, "{} ({file})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn name(raw: &str) -> SymbolName
    {
        SymbolName::new(raw.to_string(), None, SymbolLanguage::C)
    }

    #[test]
    fn test_display_name_prefers_demangled()
    {
        let symbol = SymbolName::new("_ZN3foo3barE".into(), Some("foo::bar".into()), SymbolLanguage::Rust);
        assert_eq!(symbol.display_name(), "foo::bar");
        assert_eq!(symbol.raw(), "_ZN3foo3barE");
        assert_eq!(name("main").display_name(), "main");
    }

    #[test]
    fn test_symbol_display_with_line()
    {
        let location = SourceLocation {
            file: "src/main.rs".into(),
            line: Some(42),
            column: Some(5),
        };
        let symbol = Symbol::new(name("main"), Some(location));
        assert_eq!(symbol.to_string(), "main (src/main.rs, line 42)");
    }

    #[test]
    fn test_symbol_display_without_location()
    {
        assert_eq!(Symbol::new(name("start"), None).to_string(), "start");
        let symbol = Symbol::new(name("start"), Some(SourceLocation::from_file("crt1.c")));
        assert_eq!(symbol.to_string(), "start (crt1.c)");
    }
}
