//! Parsed venue page and the views the extraction strategies read from it:
//! table structure, container text, whole-page text.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th, td").unwrap());
static CAPTION_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("caption").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "caption", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody",
    "thead", "tfoot", "tr", "ul",
];
const TABLE_FRAME: &[&str] = &["table", "thead", "tbody", "tfoot", "tr"];

/// Ordered cell texts of one table row; the first cell is the row label.
pub type RawRow = Vec<String>;

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub caption: Option<String>,
    /// Full text of the table, used by the keyword guard.
    pub text: String,
    pub rows: Vec<RawRow>,
}

impl Table {
    /// Build a table from already-extracted rows.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let text = rows
            .iter()
            .map(|r| r.join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        Table {
            caption: None,
            text,
            rows,
        }
    }
}

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Document {
            html: Html::parse_document(html),
        }
    }

    /// Every `<table>` in document order. `th` and `td` are both data cells.
    pub fn tables(&self) -> Vec<Table> {
        self.html
            .select(&TABLE_SEL)
            .map(|table| {
                let caption = table
                    .select(&CAPTION_SEL)
                    .next()
                    .map(|c| collapse_ws(&c.text().collect::<String>()))
                    .filter(|c| !c.is_empty());
                let rows = table
                    .select(&ROW_SEL)
                    .map(|tr| tr.select(&CELL_SEL).map(cell_text).collect::<RawRow>())
                    .filter(|cells| !cells.is_empty())
                    .collect();
                Table {
                    caption,
                    text: render_text(table),
                    rows,
                }
            })
            .collect()
    }

    /// Rendered text of every element matching any of `selectors`, in
    /// selector priority order. Selectors that fail to parse are skipped.
    pub fn containers<S: AsRef<str>>(&self, selectors: &[S]) -> Vec<String> {
        let mut out = Vec::new();
        for raw in selectors {
            let sel = match Selector::parse(raw.as_ref()) {
                Ok(sel) => sel,
                Err(e) => {
                    warn!("Invalid container selector {:?}: {:?}", raw.as_ref(), e);
                    continue;
                }
            };
            out.extend(self.html.select(&sel).map(render_text));
        }
        out
    }

    /// Rendered text of the whole page body.
    pub fn visible_text(&self) -> String {
        match self.html.select(&BODY_SEL).next() {
            Some(body) => render_text(body),
            None => render_text(self.html.root_element()),
        }
    }
}

/// Cell text with inline whitespace collapsed; `<br>` and block children
/// become newlines so stacked ranges stay separate.
fn cell_text(cell: ElementRef) -> String {
    render_text(cell)
        .lines()
        .map(collapse_ws)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten an element to text the way a browser's innerText lays it out:
/// whitespace collapses outside `<pre>`, block elements break lines and
/// table cells are tab-separated, so each `<tr>` is one line.
fn render_text(el: ElementRef) -> String {
    let mut out = String::new();
    render_into(el, &mut out, el.value().name() == "pre");
    out
}

fn render_into(el: ElementRef, out: &mut String, pre: bool) {
    let in_table_frame = TABLE_FRAME.contains(&el.value().name());
    for child in el.children() {
        match child.value() {
            Node::Text(text) if pre => out.push_str(text),
            // Source indentation between rows and cells isn't content.
            Node::Text(text) if in_table_frame && text.trim().is_empty() => {}
            Node::Text(text) => push_collapsed(out, text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_el.value().name();
                if SKIPPED.contains(&name) {
                    continue;
                }
                let pre = pre || name == "pre";
                match name {
                    "br" => out.push('\n'),
                    "td" | "th" => {
                        out.push('\t');
                        render_into(child_el, out, pre);
                    }
                    _ if BLOCKS.contains(&name) => {
                        out.push('\n');
                        render_into(child_el, out, pre);
                        out.push('\n');
                    }
                    _ => render_into(child_el, out, pre),
                }
            }
            _ => {}
        }
    }
}

/// Append `text` with ASCII whitespace runs folded to one space. A run
/// right after a line or cell break is dropped. `&nbsp;` is kept.
fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !out.is_empty() && !out.ends_with(|p: char| p.is_ascii_whitespace()) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Pool</title><style>td { color: red }</style></head>
<body>
<main>
  <h2>Drop-in schedule</h2>
  <table>
    <caption>Swimming - January 6 to April 6</caption>
    <tr><th>Activity</th><th>Sunday</th><th>Monday</th></tr>
    <tr><th>Public swim</th><td>9 - 11 am<br>1 - 2:30 pm</td><td>n/a</td></tr>
  </table>
  <script>var schedule = "Monday";</script>
</main>
</body></html>"#;

    #[test]
    fn tables_keep_th_cells_and_br_breaks() {
        let doc = Document::parse(PAGE);
        let tables = doc.tables();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.caption.as_deref(), Some("Swimming - January 6 to April 6"));
        assert_eq!(t.rows[0], vec!["Activity", "Sunday", "Monday"]);
        assert_eq!(t.rows[1], vec!["Public swim", "9 - 11 am\n1 - 2:30 pm", "n/a"]);
        assert!(t.text.contains("Public swim"));
    }

    #[test]
    fn visible_text_skips_scripts_and_tabs_cells() {
        let doc = Document::parse(PAGE);
        let text = doc.visible_text();
        assert!(!text.contains("var schedule"));
        assert!(!text.contains("color: red"));
        assert!(text.contains("\tSunday\tMonday"));
    }

    #[test]
    fn visible_text_of_indented_table_keeps_rows_on_one_line() {
        let doc = Document::parse(
            r#"<body>
  <div class="schedule">
    <table>
      <tr>
        <td colspan="4">Drop-in swimming</td>
      </tr>
      <tr>
        <td>Activity</td>
        <td>Sunday</td>
        <td>Monday</td>
      </tr>
      <tr>
        <td>Public
            swim</td>
        <td>9 - 10 am</td>
        <td>n/a</td>
      </tr>
    </table>
  </div>
</body>"#,
        );
        let text = doc.visible_text();
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        assert_eq!(
            lines,
            vec![
                "Drop-in swimming",
                "Activity\tSunday\tMonday",
                "Public swim\t9 - 10 am\tn/a",
            ]
        );
    }

    #[test]
    fn pre_keeps_raw_whitespace() {
        let doc = Document::parse("<body><p>a   b</p><pre>x  \ty\nz</pre></body>");
        let text = doc.visible_text();
        assert!(text.contains("a b"));
        assert!(text.contains("x  \ty\nz"));
    }

    #[test]
    fn containers_in_selector_order() {
        let doc = Document::parse(
            r#"<body><article>second</article><main>first</main></body>"#,
        );
        let texts = doc.containers(&["main", "article", "!!bad"]);
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn table_from_rows() {
        let t = Table::from_rows(vec![
            vec!["Activity".into(), "Sunday".into()],
            vec!["Public Swim".into(), "9 - 11 am".into()],
        ]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.text, "Activity Sunday\nPublic Swim 9 - 11 am");
    }
}
