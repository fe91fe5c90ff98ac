use unicode_width::UnicodeWidthStr;

/// Fixed-pitch text estimate used to size label backgrounds.
pub struct TextMetrics {
    pub char_width: f64,
    pub font_size: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            font_size: 12.0,
            line_height: 16.0,
            padding_x: 4.0,
            padding_y: 2.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    /// Size of the background box behind a (possibly multi-line) label.
    pub fn label_box(&self, text: &str) -> (f64, f64) {
        let widest = text
            .lines()
            .map(|line| self.text_width(line))
            .fold(0.0, f64::max);
        let lines = text.lines().count().max(1);
        (
            widest + self.padding_x * 2.0,
            lines as f64 * self.line_height + self.padding_y * 2.0,
        )
    }
}
