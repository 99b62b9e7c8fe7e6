//! Interchangeable renderings of one [`TabularResult`].
//!
//! A [`ResultViews`] keeps three pre-built views (grid, formatted text and
//! raw dump) plus the view the host most recently displayed. Rotation
//! follows [`VIEW_ORDER`].

use chrono::{Local, NaiveDateTime};

use crate::dump_history::DumpHistory;
use crate::settings::ViewSettings;
use crate::tabular::{ColumnKind, TabularResult};

pub const DUMP_SEPARATOR: &str = "~-~-~-~-~-~-~-~-~-~-~-~-~-~-~";
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Grid,
    Text,
    RawDump,
}

pub const VIEW_ORDER: [ViewKind; 3] = [ViewKind::Grid, ViewKind::Text, ViewKind::RawDump];

impl ViewKind {
    #[must_use]
    pub fn next(self) -> Self {
        let index = VIEW_ORDER
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(0);
        VIEW_ORDER[(index + 1) % VIEW_ORDER.len()]
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Grid => "Grid",
            Self::Text => "Text",
            Self::RawDump => "Raw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GridView {
    pub titles: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextView {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DumpView {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderedView<'a> {
    Grid(&'a GridView),
    Text(&'a TextView),
    RawDump(&'a DumpView),
}

impl RenderedView<'_> {
    #[must_use]
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::Grid(_) => ViewKind::Grid,
            Self::Text(_) => ViewKind::Text,
            Self::RawDump(_) => ViewKind::RawDump,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultViews {
    settings: ViewSettings,
    result: Option<TabularResult>,
    grid: GridView,
    text: TextView,
    dump: DumpView,
    history: DumpHistory<String>,
    current: ViewKind,
}

impl ResultViews {
    #[must_use]
    pub fn new(settings: ViewSettings) -> Self {
        let history = DumpHistory::new(settings.dump_history_limit);
        Self {
            settings,
            result: None,
            grid: GridView::default(),
            text: TextView::default(),
            dump: DumpView::default(),
            history,
            current: VIEW_ORDER[0],
        }
    }

    #[must_use]
    pub fn with_result(result: TabularResult, settings: ViewSettings) -> Self {
        let mut views = Self::new(settings);
        views.update(result);
        views
    }

    pub fn update(&mut self, result: TabularResult) {
        self.update_at(result, Local::now().naive_local());
    }

    /// Rebuilds every view from `result`. The dump history keeps earlier
    /// dumps below the new one.
    pub fn update_at(&mut self, result: TabularResult, captured_at: NaiveDateTime) {
        let grid = build_grid(&result);
        let text = TextView {
            text: render_text_table(
                &result,
                self.settings.max_col_width,
                &self.settings.column_separator,
            ),
        };
        let entry = word_wrap(
            &format!(
                "{}\n\n{}",
                captured_at.format(TIMESTAMP_FORMAT),
                result.original()
            ),
            self.settings.wrap_width,
        );

        self.history.push(entry);
        self.dump = DumpView {
            text: self
                .history
                .newest_first()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(&format!("\n\n{DUMP_SEPARATOR}\n\n")),
        };
        self.grid = grid;
        self.text = text;
        self.result = Some(result);
        self.current = VIEW_ORDER[0];
    }

    #[must_use]
    pub fn result(&self) -> Option<&TabularResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    #[must_use]
    pub fn dump_count(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn dump_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Dumps pushed out of the history since these views were created.
    #[must_use]
    pub fn dumps_evicted(&self) -> u64 {
        self.history.evicted()
    }

    #[must_use]
    pub fn current_kind(&self) -> ViewKind {
        self.current
    }

    pub fn select(&mut self, kind: ViewKind) {
        self.current = kind;
    }

    #[must_use]
    pub fn render(&self, kind: ViewKind) -> RenderedView<'_> {
        match kind {
            ViewKind::Grid => RenderedView::Grid(&self.grid),
            ViewKind::Text => RenderedView::Text(&self.text),
            ViewKind::RawDump => RenderedView::RawDump(&self.dump),
        }
    }

    pub fn select_and_render(&mut self, kind: ViewKind) -> RenderedView<'_> {
        self.select(kind);
        self.render(kind)
    }

    #[must_use]
    pub fn current_view(&self) -> RenderedView<'_> {
        self.render(self.current)
    }

    pub fn next_view(&mut self) -> RenderedView<'_> {
        self.select_and_render(self.current.next())
    }

    pub fn table_view(&mut self) -> &GridView {
        self.current = ViewKind::Grid;
        &self.grid
    }

    pub fn text_view(&mut self) -> &TextView {
        self.current = ViewKind::Text;
        &self.text
    }

    pub fn dbus_view(&mut self) -> &DumpView {
        self.current = ViewKind::RawDump;
        &self.dump
    }
}

fn build_grid(result: &TabularResult) -> GridView {
    GridView {
        titles: result.column_titles(),
        kinds: result.column_kinds(),
        rows: result.rows(),
    }
}

#[derive(Debug, Clone, Copy)]
struct ColumnFormat {
    width: usize,
}

impl ColumnFormat {
    fn apply(self, value: &str) -> String {
        let truncated = value.chars().take(self.width).collect::<String>();
        format!("{truncated:>width$}", width = self.width)
    }
}

/// Monospace table: header, `-` divider, one line per row.
#[must_use]
pub fn render_text_table(result: &TabularResult, max_col_width: usize, separator: &str) -> String {
    if result.column_count() == 0 {
        return String::new();
    }

    let titles = result
        .column_titles()
        .iter()
        .map(|title| single_line(title))
        .collect::<Vec<_>>();
    let rows = result
        .rows()
        .iter()
        .map(|row| row.iter().map(|cell| single_line(cell)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let formats = titles
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let widest = rows
                .iter()
                .filter_map(|row| row.get(index))
                .chain(std::iter::once(title))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0);
            ColumnFormat {
                width: widest.min(max_col_width),
            }
        })
        .collect::<Vec<_>>();

    let format_line = |values: &[String]| {
        formats
            .iter()
            .zip(values)
            .map(|(format, value)| format.apply(value))
            .collect::<Vec<_>>()
            .join(separator)
    };

    let total_width = formats.iter().map(|format| format.width).sum::<usize>()
        + separator.chars().count() * (formats.len() - 1);

    let mut output = String::new();
    output.push_str(&format_line(&titles));
    output.push('\n');
    output.push_str(&"-".repeat(total_width));
    output.push('\n');
    for row in &rows {
        output.push_str(&format_line(row));
        output.push('\n');
    }
    output
}

/// Keeps a cell on one output line: newlines become `⏎`, carriage returns
/// are dropped and other control characters become spaces.
fn single_line(value: &str) -> String {
    value
        .chars()
        .filter(|character| *character != '\r')
        .map(|character| match character {
            '\n' => '⏎',
            other if other.is_control() => ' ',
            other => other,
        })
        .collect()
}

/// Breaks lines before any word that would bring the line length to `width`
/// or more. Existing line breaks are kept; a single overlong word stays on
/// its own line.
#[must_use]
pub fn word_wrap(text: &str, width: usize) -> String {
    let mut wrapped = Vec::new();
    for line in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0_usize;
        let mut line_start = true;
        for word in line.split(' ') {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len >= width {
                wrapped.push(std::mem::take(&mut current));
                current_len = 0;
                line_start = true;
            }
            if !line_start {
                current.push(' ');
                current_len += 1;
            }
            line_start = false;
            current.push_str(word);
            current_len += word_len;
        }
        wrapped.push(current);
    }
    wrapped.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::{
        render_text_table, word_wrap, RenderedView, ResultViews, ViewKind, DUMP_SEPARATOR,
        VIEW_ORDER,
    };
    use crate::raw_response::{ColumnMeta, RawResponse, RawValue};
    use crate::settings::ViewSettings;
    use crate::tabular::TabularResult;

    fn people() -> TabularResult {
        let response = RawResponse::new(
            vec![
                ColumnMeta::new("Int32", "id", 4),
                ColumnMeta::new("String", "name", 32),
            ],
            "(is)",
            vec![
                vec![RawValue::Int(1), RawValue::Str("Alice".to_string())],
                vec![RawValue::Int(22), RawValue::Str("Bob".to_string())],
            ],
            vec![vec![false, false], vec![false, false]],
        );
        TabularResult::parse(&response).expect("fixture should parse")
    }

    fn single_value(value: &str) -> TabularResult {
        let response = RawResponse::new(
            vec![ColumnMeta::new("String", "value", 0)],
            "s",
            vec![vec![RawValue::Str(value.to_string())]],
            vec![vec![false]],
        );
        TabularResult::parse(&response).expect("fixture should parse")
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 17)
            .and_then(|date| date.and_hms_opt(hour, 5, 3))
            .expect("valid timestamp")
    }

    #[test]
    fn text_table_aligns_columns_to_widest_value() {
        let text = render_text_table(&people(), 20, " | ");
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "id |  name");
        assert_eq!(lines[1], "----------");
        assert_eq!(lines[2], " 1 | Alice");
        assert_eq!(lines[3], "22 |   Bob");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn text_table_truncates_to_max_column_width() {
        let text = render_text_table(&single_value("abcdefghijkl"), 5, " | ");
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "value");
        assert_eq!(lines[1], "-----");
        assert_eq!(lines[2], "abcde");
    }

    #[test]
    fn word_wrap_breaks_before_width_is_reached() {
        assert_eq!(word_wrap("aaa bbb ccc", 8), "aaa bbb\nccc");
        assert_eq!(word_wrap("aaa bbb", 7), "aaa\nbbb");
        assert_eq!(word_wrap("aaa bb", 7), "aaa bb");
        assert_eq!(word_wrap("first\nsecond", 100), "first\nsecond");
        assert_eq!(word_wrap("overlongword x", 4), "overlongword\nx");
    }

    #[test]
    fn word_wrap_keeps_leading_and_repeated_spaces() {
        assert_eq!(word_wrap("  indented line", 100), "  indented line");
        assert_eq!(word_wrap("a  b", 100), "a  b");
        assert_eq!(word_wrap("first\n    second", 100), "first\n    second");
    }

    #[test]
    fn text_table_keeps_multiline_cells_on_one_line() {
        let text = render_text_table(&single_value("CREATE\nPROC p"), 20, " | ");
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "        value");
        assert_eq!(lines[1], "-------------");
        assert_eq!(lines[2], "CREATE⏎PROC p");
    }

    #[test]
    fn next_view_cycles_back_after_three_steps() {
        let mut views = ResultViews::with_result(people(), ViewSettings::default());
        let start = views.current_kind();

        let first = views.next_view().kind();
        assert_ne!(first, start);
        views.next_view();
        let third = views.next_view().kind();
        assert_eq!(third, start);
    }

    #[test]
    fn rotation_follows_view_order() {
        let mut views = ResultViews::with_result(people(), ViewSettings::default());
        assert_eq!(views.current_kind(), ViewKind::Grid);
        assert_eq!(views.next_view().kind(), ViewKind::Text);
        assert_eq!(views.next_view().kind(), ViewKind::RawDump);
        assert_eq!(views.next_view().kind(), ViewKind::Grid);
    }

    #[test]
    fn getters_mark_the_returned_view_current() {
        let mut views = ResultViews::with_result(people(), ViewSettings::default());

        views.text_view();
        assert_eq!(views.current_kind(), ViewKind::Text);
        views.dbus_view();
        assert_eq!(views.current_kind(), ViewKind::RawDump);
        let grid = views.table_view();
        assert_eq!(grid.titles, vec!["id", "name"]);
        assert_eq!(views.current_kind(), ViewKind::Grid);
    }

    #[test]
    fn render_is_pure_and_select_only_moves_current() {
        let mut views = ResultViews::with_result(people(), ViewSettings::default());

        let rendered = views.render(ViewKind::Text);
        assert!(matches!(rendered, RenderedView::Text(_)));
        assert_eq!(views.current_kind(), ViewKind::Grid);

        views.select(ViewKind::RawDump);
        assert_eq!(views.current_kind(), ViewKind::RawDump);
        assert!(matches!(views.current_view(), RenderedView::RawDump(_)));
    }

    #[test]
    fn update_resets_rotation_and_rebuilds_views() {
        let mut views = ResultViews::with_result(people(), ViewSettings::default());
        views.next_view();
        views.next_view();

        views.update(single_value("fresh"));

        assert_eq!(views.current_kind(), VIEW_ORDER[0]);
        let RenderedView::Grid(grid) = views.current_view() else {
            panic!("first view should be the grid");
        };
        assert_eq!(grid.rows, vec![vec!["fresh".to_string()]]);
        assert!(views.text_view().text.contains("fresh"));
    }

    #[test]
    fn dump_history_is_newest_first_and_bounded() {
        let settings = ViewSettings {
            dump_history_limit: 2,
            ..ViewSettings::default()
        };
        let mut views = ResultViews::new(settings);
        views.update_at(single_value("one"), at(9));
        views.update_at(single_value("two"), at(10));
        views.update_at(single_value("three"), at(11));

        let dump = views.dbus_view().text.clone();
        let entries = dump
            .split(&format!("\n\n{DUMP_SEPARATOR}\n\n"))
            .collect::<Vec<_>>();

        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Sat Oct 17 11:05:03 2026\n\n"));
        assert!(entries[0].contains("\"three\""));
        assert!(entries[1].contains("\"two\""));
        assert!(!dump.contains("\"one\""));
        assert_eq!(views.dump_count(), 2);
        assert_eq!(views.dump_capacity(), 2);
        assert_eq!(views.dumps_evicted(), 1);
    }

    #[test]
    fn empty_views_render_empty_content() {
        let mut views = ResultViews::new(ViewSettings::default());

        assert!(views.result().is_none());
        assert!(views.table_view().rows.is_empty());
        assert!(views.text_view().text.is_empty());
        assert!(views.dbus_view().text.is_empty());
    }
}
