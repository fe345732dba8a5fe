//! Line writer with nested indentation

/// Line terminator for every written line
const LINE_ENDING: &str = "\n";
/// One level of [`LineWriter::indented`]
const INDENT: &str = "\t";

/// Accumulates text line by line, prefixing each new line with the
/// current indentation stack.
#[derive(Debug, Clone, Default)]
pub struct LineWriter {
    output: String,
    indents: Vec<String>,
    /// Nothing written on the current line yet
    line_pending: bool,
}

impl LineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to the current line
    pub fn write(&mut self, text: &str) {
        self.ensure_indent();
        self.output.push_str(text);
    }

    /// Append text and finish the line
    pub fn write_line(&mut self, text: &str) {
        self.write(text);
        self.end_line();
    }

    pub fn end_line(&mut self) {
        self.output.push_str(LINE_ENDING);
        self.line_pending = false;
    }

    /// Run `f` with one more tab of indentation
    pub fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indented_with(INDENT, f)
    }

    /// Run `f` with one more level of a custom indentation string
    pub fn indented_with<R>(&mut self, indent: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.indents.push(indent.to_string());
        let result = f(self);
        self.indents.pop();
        result
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn ensure_indent(&mut self) {
        if !self.line_pending {
            for indent in &self.indents {
                self.output.push_str(indent);
            }
            self.line_pending = true;
        }
    }
}
