/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use rain_core::compiler::CompilerOptions;
///
/// let options = CompilerOptions {
///     debug: true,
///     ..CompilerOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Emit `Breakpoint` before every statement and fill the debug table.
    ///
    /// Default: false
    pub debug: bool,

    /// Align each local to the smaller of its size and 8 bytes.
    ///
    /// Default: false
    pub align_locals: bool,

    /// File id stamped into anchors.
    ///
    /// Default: 0
    pub file: u32,

    /// Indentation width of a tab character.
    ///
    /// Default: 4
    pub tab_width: u32,

    /// Initial size of the data segment in bytes. The segment grows when
    /// constant data is written past its end.
    ///
    /// Default: 0
    pub data_size: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug: false,
            align_locals: false,
            file: 0,
            tab_width: 4,
            data_size: 0,
        }
    }
}
