use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Tabs,
    },
    Frame,
};

use crate::error::Result;
use crate::fmt::brl_compact;
use crate::reports::FullReport;
use crate::tui::{
    money_span, run_report_view, ReportView, ReportViewAction, AMOUNT_NEG_STYLE, AMOUNT_POS_STYLE,
    FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE,
};

use super::Section;

const HEADER_ROW_STYLE: Style = Style::new()
    .fg(Color::DarkGray)
    .add_modifier(Modifier::BOLD);

/// Colours cycled across expense categories.
const CATEGORY_PALETTE: &[Color] = &[
    Color::Rgb(80, 160, 255),
    Color::Rgb(255, 170, 60),
    Color::Rgb(80, 220, 100),
    Color::Rgb(230, 90, 90),
    Color::Rgb(170, 120, 240),
    Color::Rgb(70, 210, 200),
    Color::Rgb(240, 220, 90),
    Color::Rgb(200, 200, 200),
];

/// Longest client label drawn under a bar group.
const CLIENT_LABEL_WIDTH: usize = 8;

/// Open the dashboard on `section` (or the first tab).
pub fn dispatch(section: Option<Section>, report: FullReport, top_clients: usize) -> Result<()> {
    let mut view = DashboardView::new(report, top_clients, section.unwrap_or(Section::Revenue));
    run_report_view(&mut view)
}

// ---------------------------------------------------------------------------
// Dashboard: one tab per section, table on top, chart below
// ---------------------------------------------------------------------------

pub(crate) struct DashboardView {
    report: FullReport,
    top_clients: usize,
    tab: Section,
    offset: usize,
    visible_count: usize,
}

impl DashboardView {
    pub(crate) fn new(report: FullReport, top_clients: usize, tab: Section) -> Self {
        Self {
            report,
            top_clients,
            tab,
            offset: 0,
            visible_count: 10,
        }
    }

    fn select(&mut self, tab: Section) {
        if self.tab != tab {
            self.tab = tab;
            self.offset = 0;
        }
    }

    fn cycle(&mut self, delta: isize) {
        let n = Section::ALL.len() as isize;
        let idx = (self.tab.index() as isize + delta).rem_euclid(n) as usize;
        self.select(Section::ALL[idx]);
    }

    fn row_count(&self) -> usize {
        match self.tab {
            Section::Revenue => self.report.revenue.billed.len(),
            Section::Expenses => self.report.expenses.months.len(),
            Section::Clients => self.report.clients.clients.len(),
        }
    }

    // -- tables -------------------------------------------------------------

    fn table_parts(&self) -> (Row<'static>, Vec<Row<'static>>, Vec<Constraint>) {
        match self.tab {
            Section::Revenue => {
                let header = Row::new(vec!["Mês", "Receita"]).style(HEADER_ROW_STYLE);
                let rows = self
                    .report
                    .revenue
                    .billed
                    .iter()
                    .map(|b| Row::new(vec![Cell::from(b.month.label()), Cell::from(money_span(b.total))]))
                    .collect();
                (header, rows, vec![Constraint::Length(10), Constraint::Length(20)])
            }
            Section::Expenses => {
                let pivot = &self.report.expenses;
                let mut head = vec![Cell::from("Mês")];
                head.extend(pivot.categories.iter().map(|c| Cell::from(c.clone())));
                let header = Row::new(head).style(HEADER_ROW_STYLE);
                let rows = pivot
                    .months
                    .iter()
                    .zip(pivot.values.iter())
                    .map(|(m, values)| {
                        let mut cells = vec![Cell::from(m.label())];
                        cells.extend(values.iter().map(|v| Cell::from(money_span(*v))));
                        Row::new(cells)
                    })
                    .collect();
                let mut widths = vec![Constraint::Length(10)];
                widths.extend(pivot.categories.iter().map(|_| Constraint::Min(16)));
                (header, rows, widths)
            }
            Section::Clients => {
                let header = Row::new(vec!["Cliente", "Receita Total", "Custo Estimado", "Margem Estimada"])
                    .style(HEADER_ROW_STYLE);
                let rows = self
                    .report
                    .clients
                    .clients
                    .iter()
                    .map(|c| {
                        Row::new(vec![
                            Cell::from(c.client.clone()),
                            Cell::from(money_span(c.revenue)),
                            Cell::from(money_span(c.cost)),
                            Cell::from(money_span(c.margin)),
                        ])
                    })
                    .collect();
                (
                    header,
                    rows,
                    vec![
                        Constraint::Fill(1),
                        Constraint::Length(18),
                        Constraint::Length(18),
                        Constraint::Length(18),
                    ],
                )
            }
        }
    }

    fn draw_table(&mut self, frame: &mut Frame, area: Rect) {
        let (header, rows, widths) = self.table_parts();
        if rows.is_empty() {
            frame.render_widget(Paragraph::new(" Sem dados para esta seção.").style(FOOTER_STYLE), area);
            return;
        }

        // Header takes two lines: header + bottom_margin
        let visible = area.height.saturating_sub(2) as usize;
        self.visible_count = visible.max(1);
        let max = rows.len().saturating_sub(self.visible_count);
        self.offset = self.offset.min(max);

        let visible_rows: Vec<Row> = rows.into_iter().skip(self.offset).take(visible).collect();
        let table = Table::new(visible_rows, widths)
            .header(header.bottom_margin(1))
            .column_spacing(2);
        frame.render_widget(table, area);
    }

    // -- charts -------------------------------------------------------------

    fn draw_chart(&self, frame: &mut Frame, area: Rect) {
        match self.tab {
            Section::Revenue => self.draw_revenue_chart(frame, area),
            Section::Expenses => self.draw_expense_chart(frame, area),
            Section::Clients => self.draw_client_chart(frame, area),
        }
    }

    /// Line chart of billed revenue; months with nothing billed break the line.
    fn draw_revenue_chart(&self, frame: &mut Frame, area: Rect) {
        let series = self.report.revenue.chart_series();
        if series.is_empty() {
            return;
        }

        let mut segments: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
        for (i, (_, value)) in series.iter().enumerate() {
            match value {
                Some(v) => {
                    if let Some(s) = segments.last_mut() {
                        s.push((i as f64, *v));
                    }
                }
                None => {
                    if segments.last().is_some_and(|s| !s.is_empty()) {
                        segments.push(Vec::new());
                    }
                }
            }
        }
        segments.retain(|s| !s.is_empty());
        let points: Vec<(f64, f64)> = segments.iter().flatten().copied().collect();

        let (y_min, y_max) = value_bounds(points.iter().map(|(_, y)| *y));
        let x_max = (series.len().saturating_sub(1)).max(1) as f64;

        let mut datasets: Vec<Dataset> = segments
            .iter()
            .map(|s| {
                Dataset::default()
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(AMOUNT_POS_STYLE)
                    .data(s)
            })
            .collect();
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(AMOUNT_POS_STYLE)
                .data(&points),
        );

        let first = series.first().map(|(m, _)| m.label()).unwrap_or_default();
        let last = series.last().map(|(m, _)| m.label()).unwrap_or_default();
        let chart = Chart::new(datasets)
            .block(chart_block("Receita faturada por mês"))
            .x_axis(
                Axis::default()
                    .style(FOOTER_STYLE)
                    .bounds([0.0, x_max])
                    .labels(vec![first, last]),
            )
            .y_axis(
                Axis::default()
                    .style(FOOTER_STYLE)
                    .bounds([y_min, y_max])
                    .labels(vec![
                        brl_compact(y_min),
                        brl_compact((y_min + y_max) / 2.0),
                        brl_compact(y_max),
                    ]),
            );
        frame.render_widget(chart, area);
    }

    /// Bars per month, one colour per expense category.
    fn draw_expense_chart(&self, frame: &mut Frame, area: Rect) {
        let pivot = &self.report.expenses;
        if pivot.is_empty() {
            return;
        }
        let [bars_area, legend_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);

        let mut chart = BarChart::default()
            .block(chart_block("Despesas por mês e por tipo"))
            .bar_width(3)
            .bar_gap(0)
            .group_gap(2);
        for (month, values) in pivot.months.iter().zip(pivot.values.iter()) {
            let bars: Vec<Bar> = values
                .iter()
                .enumerate()
                .map(|(ci, v)| {
                    Bar::default()
                        .value(bar_value(*v))
                        .text_value(String::new())
                        .style(Style::default().fg(category_color(ci)))
                })
                .collect();
            chart = chart.data(BarGroup::default().label(Line::from(month.label())).bars(&bars));
        }
        frame.render_widget(chart, bars_area);

        let legend: Vec<Span> = pivot
            .categories
            .iter()
            .enumerate()
            .flat_map(|(ci, name)| {
                [
                    Span::styled(" \u{25a0} ", Style::default().fg(category_color(ci))),
                    Span::raw(name.clone()),
                ]
            })
            .collect();
        frame.render_widget(Paragraph::new(Line::from(legend)), legend_area);
    }

    /// Revenue vs. estimated cost for the top clients by revenue.
    fn draw_client_chart(&self, frame: &mut Frame, area: Rect) {
        let top = self.report.clients.top_by_revenue(self.top_clients);
        if top.is_empty() {
            return;
        }
        let [bars_area, legend_area] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);

        let title = format!("Comparativo Receita vs. Custo dos {} principais clientes", top.len());
        let mut chart = BarChart::default()
            .block(chart_block(&title))
            .bar_width(2)
            .bar_gap(0)
            .group_gap(1);
        for c in &top {
            let bars = vec![
                Bar::default()
                    .value(bar_value(c.revenue))
                    .text_value(String::new())
                    .style(AMOUNT_POS_STYLE),
                Bar::default()
                    .value(bar_value(c.cost))
                    .text_value(String::new())
                    .style(AMOUNT_NEG_STYLE),
            ];
            chart = chart.data(
                BarGroup::default()
                    .label(Line::from(truncate(&c.client, CLIENT_LABEL_WIDTH)))
                    .bars(&bars),
            );
        }
        frame.render_widget(chart, bars_area);

        let legend = Line::from(vec![
            Span::styled(" \u{25a0} ", AMOUNT_POS_STYLE),
            Span::raw("Receita Total"),
            Span::styled(" \u{25a0} ", AMOUNT_NEG_STYLE),
            Span::raw("Custo Estimado"),
        ]);
        frame.render_widget(Paragraph::new(legend), legend_area);
    }
}

impl ReportView for DashboardView {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, tabs_area, sep_area, table_area, chart_area, footer_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Percentage(40),
                Constraint::Fill(1),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.tab.title())).style(HEADER_STYLE),
            header_area,
        );

        let tabs = Tabs::new(Section::ALL.iter().map(|s| format!("{} {}", s.index() + 1, s.tab_label())))
            .select(self.tab.index())
            .style(FOOTER_STYLE)
            .highlight_style(SELECTED_STYLE);
        frame.render_widget(tabs, tabs_area);

        frame.render_widget(
            Paragraph::new("━".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );

        self.draw_table(frame, table_area);
        self.draw_chart(frame, chart_area);

        let total = self.row_count();
        let pos_info = if total > self.visible_count {
            format!("  line {}/{}", self.offset + 1, total)
        } else {
            String::new()
        };
        frame.render_widget(
            Paragraph::new(format!(
                " Tab/\u{2190}/\u{2192}=section  \u{2191}/\u{2193}=scroll  q/Esc=close{pos_info}"
            ))
            .style(FOOTER_STYLE),
            footer_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ReportViewAction {
        let page = self.visible_count;
        let max = self.row_count().saturating_sub(page);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ReportViewAction::Close,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.cycle(1),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => self.cycle(-1),
            KeyCode::Char('1') => self.select(Section::Revenue),
            KeyCode::Char('2') => self.select(Section::Expenses),
            KeyCode::Char('3') => self.select(Section::Clients),
            KeyCode::Up | KeyCode::Char('k') => self.offset = self.offset.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.offset = (self.offset + 1).min(max),
            KeyCode::PageUp => self.offset = self.offset.saturating_sub(page),
            KeyCode::PageDown => self.offset = (self.offset + page).min(max),
            KeyCode::Home => self.offset = 0,
            KeyCode::End => self.offset = max,
            _ => {}
        }
        ReportViewAction::Continue
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn chart_block(title: &str) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .title_style(Style::default().add_modifier(Modifier::BOLD))
        .borders(Borders::NONE)
}

fn category_color(idx: usize) -> Color {
    CATEGORY_PALETTE[idx % CATEGORY_PALETTE.len()]
}

/// Bars are whole reais; negative values draw as empty bars.
fn bar_value(v: f64) -> u64 {
    v.max(0.0).round() as u64
}

/// Y-axis bounds that always include zero and leave 10% headroom.
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let hi = if hi == lo { lo + 1.0 } else { hi };
    (lo * 1.1, hi * 1.1)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    }
}
