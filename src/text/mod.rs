//! # Text Flow
//!
//! Line breaking, justification and height-constrained splitting of a text
//! run or a sequence of styled runs.
//!
//! The module is stateless and knows nothing about pages: it is handed a max
//! width and line height and reports lines and heights. Element measurers use
//! it to size auto-height content and to split text that straddles a page.
//!
//! Breaking is greedy over whitespace-delimited words. Runs of whitespace
//! collapse to a single space. A word wider than the line is broken at
//! character boundaries, which also covers degenerate widths: with a zero or
//! negative max width every character lands on its own line.

pub mod metrics;
pub mod split;

pub use metrics::{AverageWidthMetrics, FontMetrics};
pub use split::{split_lines, SplitPoint};

/// A contiguous piece of text sharing one font size and letter spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font_size: f64,
    pub letter_spacing: f64,
}

impl TextRun {
    pub fn new(text: &str, font_size: f64) -> Self {
        Self {
            text: text.to_string(),
            font_size,
            letter_spacing: 0.0,
        }
    }
}

/// How a line ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    /// Wrapped at a space between words.
    Wrap,
    /// A word too wide for the line was cut here; the next line continues it.
    MidWord,
    /// Last line of its paragraph (explicit break or end of text).
    Paragraph,
}

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLine {
    /// The line's text with whitespace collapsed.
    pub text: String,
    /// Natural width including letter spacing.
    pub width: f64,
    /// Words (or word fragments) on the line.
    pub word_count: usize,
    pub end: LineEnd,
    /// The line's text by source run, in order.
    pub spans: Vec<RunSpan>,
    /// For a wrapped line, the run the collapsed space at the wrap came from.
    pub break_run: Option<usize>,
}

/// Text taken from the run at index `run` of the flowed input.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpan {
    pub run: usize,
    pub text: String,
}

fn push_span(spans: &mut Vec<RunSpan>, run: usize, text: &str) {
    match spans.last_mut() {
        Some(last) if last.run == run => last.text.push_str(text),
        _ => spans.push(RunSpan {
            run,
            text: text.to_string(),
        }),
    }
}

impl FlowLine {
    pub fn is_paragraph_end(&self) -> bool {
        self.end == LineEnd::Paragraph
    }
}

/// Horizontal alignment of lines within the max width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn parse(value: &str) -> Self {
        match value {
            "center" => TextAlign::Center,
            "right" => TextAlign::Right,
            "justify" => TextAlign::Justify,
            _ => TextAlign::Left,
        }
    }
}

/// Where a line starts and how much extra space each inter-word gap gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePlacement {
    pub x_offset: f64,
    pub extra_word_gap: f64,
}

/// The result of flowing text into a fixed width.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFlow {
    pub lines: Vec<FlowLine>,
    pub max_width: f64,
    pub line_height: f64,
}

impl TextFlow {
    pub fn total_height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Position of line `index` under `align`.
    pub fn placement(&self, index: usize, align: TextAlign) -> LinePlacement {
        let Some(line) = self.lines.get(index) else {
            return LinePlacement {
                x_offset: 0.0,
                extra_word_gap: 0.0,
            };
        };
        let slack = (self.max_width - line.width).max(0.0);
        match align {
            TextAlign::Left => LinePlacement {
                x_offset: 0.0,
                extra_word_gap: 0.0,
            },
            TextAlign::Center => LinePlacement {
                x_offset: slack / 2.0,
                extra_word_gap: 0.0,
            },
            TextAlign::Right => LinePlacement {
                x_offset: slack,
                extra_word_gap: 0.0,
            },
            TextAlign::Justify => LinePlacement {
                x_offset: 0.0,
                extra_word_gap: justify_gap(line, self.max_width),
            },
        }
    }

    /// Split the flow at `available_height`, honoring orphan and widow
    /// minimums. Returns `None` when the block should move whole.
    pub fn split(&self, available_height: f64, orphans: usize, widows: usize) -> Option<(TextFlow, TextFlow)> {
        let SplitPoint { fit_lines } = split_lines(
            self.lines.len(),
            self.line_height,
            available_height,
            orphans,
            widows,
        )?;
        let (fit, overflow) = self.lines.split_at(fit_lines);
        let part = |lines: &[FlowLine]| TextFlow {
            lines: lines.to_vec(),
            max_width: self.max_width,
            line_height: self.line_height,
        };
        Some((part(fit), part(overflow)))
    }

    /// Rebuild source text from the lines, one span per stretch of a single
    /// source run. Paragraph ends become newlines and mid-word cuts are
    /// joined without a space, so re-flowing runs built from the spans at the
    /// same width reproduces these lines.
    pub fn to_spans(&self) -> Vec<RunSpan> {
        let mut out: Vec<RunSpan> = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            for span in &line.spans {
                push_span(&mut out, span.run, &span.text);
            }
            if i + 1 == self.lines.len() {
                break;
            }
            let last = out.last().map_or(0, |s| s.run);
            match line.end {
                LineEnd::Wrap => push_span(&mut out, line.break_run.unwrap_or(last), " "),
                LineEnd::MidWord => {}
                LineEnd::Paragraph => push_span(&mut out, last, "\n"),
            }
        }
        out
    }

    /// [`to_spans`](Self::to_spans) without the run boundaries.
    pub fn to_text(&self) -> String {
        self.to_spans().into_iter().map(|s| s.text).collect()
    }
}

/// Extra space per inter-word gap that makes `line` fill `max_width`.
/// Paragraph-final and single-word lines are not stretched.
pub fn justify_gap(line: &FlowLine, max_width: f64) -> f64 {
    if line.is_paragraph_end() || line.word_count < 2 {
        return 0.0;
    }
    ((max_width - line.width) / (line.word_count - 1) as f64).max(0.0)
}

/// A character with its resolved advance and the letter spacing that follows
/// it when another character comes after.
#[derive(Debug, Clone, Copy)]
struct Glyph {
    ch: char,
    advance: f64,
    spacing: f64,
    run: usize,
}

/// Running state of the line being built.
struct LineBuilder {
    glyphs: Vec<Glyph>,
    words: usize,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            glyphs: Vec::new(),
            words: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    fn finish(&mut self, end: LineEnd) -> FlowLine {
        let glyphs = std::mem::take(&mut self.glyphs);
        let words = std::mem::replace(&mut self.words, 0);
        let mut spans = Vec::new();
        for g in &glyphs {
            push_span(&mut spans, g.run, g.ch.encode_utf8(&mut [0; 4]));
        }
        FlowLine {
            text: glyphs.iter().map(|g| g.ch).collect(),
            width: glyphs_width(&glyphs),
            word_count: words,
            end,
            spans,
            break_run: None,
        }
    }
}

/// Width of a glyph sequence: advances plus one letter-spacing per boundary.
fn glyphs_width(glyphs: &[Glyph]) -> f64 {
    let advances: f64 = glyphs.iter().map(|g| g.advance).sum();
    let spacing: f64 = match glyphs.split_last() {
        Some((_, rest)) => rest.iter().map(|g| g.spacing).sum(),
        None => 0.0,
    };
    advances + spacing
}

/// Width of `candidate` appended to `line` after an optional joining space.
fn joined_width(line: &[Glyph], space: Option<Glyph>, candidate: &[Glyph]) -> f64 {
    let mut all: Vec<Glyph> = Vec::with_capacity(line.len() + candidate.len() + 1);
    all.extend_from_slice(line);
    all.extend(space);
    all.extend_from_slice(candidate);
    glyphs_width(&all)
}

/// A word plus the whitespace glyph that preceded it (used as the joiner).
struct Word {
    glyphs: Vec<Glyph>,
    space: Option<Glyph>,
}

/// Flow a single run of uniform text.
pub fn flow_text(
    metrics: &dyn FontMetrics,
    run: &TextRun,
    max_width: f64,
    line_height: f64,
) -> TextFlow {
    flow_runs(metrics, std::slice::from_ref(run), max_width, line_height)
}

/// Flow a sequence of styled runs. Words may span run boundaries.
pub fn flow_runs(
    metrics: &dyn FontMetrics,
    runs: &[TextRun],
    max_width: f64,
    line_height: f64,
) -> TextFlow {
    let mut lines = Vec::new();

    for paragraph in paragraphs(metrics, runs) {
        let mut line = LineBuilder::new();
        for word in paragraph {
            let joiner = if line.is_empty() { None } else { word.space };
            if joined_width(&line.glyphs, joiner, &word.glyphs) <= max_width {
                line.glyphs.extend(joiner);
                line.glyphs.extend_from_slice(&word.glyphs);
                line.words += 1;
                continue;
            }

            if !line.is_empty() {
                let mut wrapped = line.finish(LineEnd::Wrap);
                wrapped.break_run = word.space.map(|g| g.run);
                lines.push(wrapped);
            }

            if glyphs_width(&word.glyphs) <= max_width {
                line.glyphs.extend_from_slice(&word.glyphs);
                line.words = 1;
                continue;
            }

            // Too wide for an empty line: cut at character boundaries. Every
            // line takes at least one glyph so degenerate widths terminate.
            let mut rest = word.glyphs.as_slice();
            loop {
                let mut take = 1;
                while take < rest.len() && glyphs_width(&rest[..=take]) <= max_width {
                    take += 1;
                }
                line.glyphs.extend_from_slice(&rest[..take]);
                line.words = 1;
                rest = &rest[take..];
                if rest.is_empty() {
                    break;
                }
                lines.push(line.finish(LineEnd::MidWord));
            }
        }
        lines.push(line.finish(LineEnd::Paragraph));
    }

    if lines.is_empty() {
        lines.push(LineBuilder::new().finish(LineEnd::Paragraph));
    }

    TextFlow {
        lines,
        max_width,
        line_height,
    }
}

/// Split styled runs into paragraphs of words. Explicit line breaks (`\n`,
/// `\r\n`, `\r`, U+2028, U+2029) start a new paragraph.
fn paragraphs(metrics: &dyn FontMetrics, runs: &[TextRun]) -> Vec<Vec<Word>> {
    let mut paragraphs: Vec<Vec<Word>> = vec![Vec::new()];
    let mut current: Vec<Glyph> = Vec::new();
    let mut pending_space: Option<Glyph> = None;
    let mut prev_cr = false;

    let flush = |paragraphs: &mut Vec<Vec<Word>>, current: &mut Vec<Glyph>, space: &mut Option<Glyph>| {
        if !current.is_empty() {
            if let Some(words) = paragraphs.last_mut() {
                words.push(Word {
                    glyphs: std::mem::take(current),
                    space: space.take(),
                });
            }
        }
    };

    for (index, run) in runs.iter().enumerate() {
        for ch in run.text.chars() {
            let is_break = matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}');
            if is_break {
                let crlf = ch == '\n' && prev_cr;
                prev_cr = ch == '\r';
                if crlf {
                    continue;
                }
                flush(&mut paragraphs, &mut current, &mut pending_space);
                pending_space = None;
                paragraphs.push(Vec::new());
                continue;
            }
            prev_cr = false;

            if ch.is_whitespace() {
                flush(&mut paragraphs, &mut current, &mut pending_space);
                if pending_space.is_none() {
                    pending_space = Some(Glyph {
                        ch: ' ',
                        advance: metrics.char_width(' ', run.font_size),
                        spacing: run.letter_spacing,
                        run: index,
                    });
                }
                continue;
            }

            current.push(Glyph {
                ch,
                advance: metrics.char_width(ch, run.font_size),
                spacing: run.letter_spacing,
                run: index,
            });
        }
    }
    flush(&mut paragraphs, &mut current, &mut pending_space);

    paragraphs
}
