use anyhow::{Context, anyhow};
use promptpad_engine::traits::{DocumentEditor, EditTarget, EditorSnapshot};
use promptpad_runtime::fs_util::write_atomically;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

/// Inclusive, 1-based line range such as `3:5` or `4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl FromStr for LineRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid line number: {v:?}"))
        };
        let (start, end) = match s.split_once(':') {
            Some((a, b)) => (parse(a)?, parse(b)?),
            None => {
                let n = parse(s)?;
                (n, n)
            }
        };
        if start == 0 || end < start {
            return Err(format!("invalid line range: {s:?}"));
        }
        Ok(LineRange { start, end })
    }
}

#[derive(Debug, Default)]
struct EditorState {
    text: String,
    selection: Option<Range<usize>>,
    cursor: usize,

    // Span produced by the last write/append; streamed chunks extend it.
    last: Option<Range<usize>>,
}

/// A markdown file standing in for the host editor. Every edit is saved
/// to disk immediately.
#[derive(Debug)]
pub struct FileEditor {
    path: PathBuf,
    state: Mutex<EditorState>,
}

impl FileEditor {
    /// Opens `path`; a missing file starts out empty.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("read {}", path.display())));
            }
        };
        let cursor = text.len();
        Ok(Self {
            path,
            state: Mutex::new(EditorState {
                text,
                cursor,
                ..Default::default()
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_selection(self, lines: LineRange) -> anyhow::Result<Self> {
        {
            let mut st = self.lock()?;
            let spans = line_spans(&st.text);
            let count = spans.len();
            let out_of_range = || anyhow!("{} has only {count} line(s)", self.path.display());
            let first = spans.get(lines.start - 1).ok_or_else(out_of_range)?;
            let last = spans.get(lines.end - 1).ok_or_else(out_of_range)?;

            let end = trim_line_break(&st.text, last.clone());
            st.selection = Some(first.start..end);
        }
        Ok(self)
    }

    /// Places the cursor after line `line` (0 = start of file, `None` = end of file).
    pub fn with_cursor_after_line(self, line: Option<usize>) -> anyhow::Result<Self> {
        {
            let mut st = self.lock()?;
            let cursor = match line {
                None => st.text.len(),
                Some(0) => 0,
                Some(n) => {
                    let spans = line_spans(&st.text);
                    spans
                        .get(n - 1)
                        .map(|s| s.end)
                        .ok_or_else(|| {
                            anyhow!("{} has only {} line(s)", self.path.display(), spans.len())
                        })?
                }
            };
            st.cursor = cursor;
        }
        Ok(self)
    }

    pub fn contents(&self) -> anyhow::Result<String> {
        Ok(self.lock()?.text.clone())
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, EditorState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("editor state lock poisoned"))
    }

    fn persist(&self, text: &str) -> anyhow::Result<()> {
        write_atomically(&self.path, text.as_bytes())
            .with_context(|| format!("save {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl DocumentEditor for FileEditor {
    async fn snapshot(&self) -> anyhow::Result<EditorSnapshot> {
        let st = self.lock()?;
        Ok(EditorSnapshot {
            selection: st.selection.clone().map(|r| st.text[r].to_string()),
            document: st.text.clone(),
        })
    }

    async fn write(&self, target: EditTarget, text: &str) -> anyhow::Result<()> {
        let mut st = self.lock()?;
        let span = match target {
            EditTarget::Selection => {
                let range = st.selection.clone().context("nothing is selected")?;
                st.text.replace_range(range.clone(), text);
                range.start..range.start + text.len()
            }
            EditTarget::Document => {
                st.text = text.to_string();
                0..text.len()
            }
            EditTarget::Cursor => {
                let mut pos = st.cursor;
                if pos > 0 && !st.text[..pos].ends_with('\n') {
                    st.text.insert(pos, '\n');
                    pos += 1;
                }
                st.text.insert_str(pos, text);
                pos..pos + text.len()
            }
        };

        if target == EditTarget::Selection {
            st.selection = Some(span.clone());
        }
        st.last = Some(span);
        self.persist(&st.text)
    }

    async fn append(&self, target: EditTarget, chunk: &str) -> anyhow::Result<()> {
        let mut st = self.lock()?;
        let mut span = st.last.clone().context("append before any write")?;
        st.text.insert_str(span.end, chunk);
        span.end += chunk.len();

        if target == EditTarget::Selection {
            st.selection = Some(span.clone());
        }
        st.last = Some(span);
        self.persist(&st.text)
    }
}

/// Byte spans of each line, including its line break.
fn line_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = vec![];
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        spans.push(offset..offset + line.len());
        offset += line.len();
    }
    spans
}

fn trim_line_break(text: &str, span: Range<usize>) -> usize {
    let line = &text[span.clone()];
    let trimmed = line.trim_end_matches(['\n', '\r']);
    span.start + trimmed.len()
}
