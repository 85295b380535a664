/// Line-oriented text builder for generated sources.
///
/// Lines are collected into a `Vec<String>` and joined once at the end.
/// Indentation is tracked so nested emitters don't have to pass prefixes
/// around; blank lines never carry trailing whitespace.
pub struct CodeWriter {
    lines:  Vec<String>,
    indent: usize,
    unit:   &'static str,
}

impl CodeWriter {
    pub fn new(unit: &'static str) -> CodeWriter {
        CodeWriter {
            lines: Vec::new(),
            indent: 0,
            unit,
        }
    }

    /// Four-space indentation, used by every emitter.
    pub fn spaces() -> CodeWriter {
        CodeWriter::new("    ")
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", self.unit.repeat(self.indent), text));
        }
    }

    /// Adds a blank line unless the previous one already is blank.
    pub fn blank(&mut self) {
        if self.lines.last().map_or(false, |last| !last.is_empty()) {
            self.lines.push(String::new());
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Writes `text` and indents what follows, e.g. `if (x) {`.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.indent();
    }

    /// Dedents and writes `text`, e.g. `}`.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.dedent();
        self.line(text);
    }

    /// Writes a block of text, one line per `\n`.
    pub fn block(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    /// Appends another writer's lines at the current indentation.
    pub fn append(&mut self, other: CodeWriter) {
        for line in other.lines {
            self.line(line);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn finish(mut self) -> String {
        while self.lines.last().map_or(false, |last| last.is_empty()) {
            self.lines.pop();
        }
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_and_blanks() {
        let mut w = CodeWriter::spaces();
        w.line("int main(void)");
        w.open("{");
        w.line("return 0;");
        w.blank();
        w.blank();
        w.close("}");
        w.blank();
        assert_eq!(w.finish(), "int main(void)\n{\n    return 0;\n\n}\n");
    }

    #[test]
    fn append_reindents() {
        let mut inner = CodeWriter::spaces();
        inner.line("a;");
        inner.blank();
        let mut outer = CodeWriter::spaces();
        outer.open("{");
        outer.append(inner);
        outer.close("}");
        assert_eq!(outer.finish(), "{\n    a;\n\n}\n");
    }
}
