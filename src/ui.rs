use crate::app::AppState;
use crate::filter::FilterSelector;
use crate::model::TaskId;
use crate::reorder::RowSpan;
use crate::storage::{BlobStore, StoreLocation};
use crate::view::{RenderedList, RowAction, RowView};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, error};

const ROW_HEIGHT: u16 = 1;

pub fn run<B: BlobStore>(state: AppState<B>, location: StoreLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(state, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App<B: BlobStore> {
    state: AppState<B>,
    location: StoreLocation,
    /// Position in the rendered rows, not in the collection.
    selected: usize,
    offset: usize,
    last_save: Option<Instant>,
    status: String,
    mode: Mode,
    list_area: Rect,
    hits: Vec<RowHit>,
}

enum Mode {
    Normal,
    Adding(TaskForm),
    Editing { id: TaskId, field: FieldValue },
    ConfirmDelete { id: TaskId },
}

struct TaskForm {
    text: FieldValue,
    category: usize,
}

/// Screen areas of a drawn row and its affordances, for mouse hit-testing.
struct RowHit {
    row: usize,
    area: Rect,
    actions: Vec<(RowAction, Rect)>,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(self.cursor, &self.value);
    }

    fn home(&mut self) {
        self.cursor = 0;
    }

    fn end(&mut self) {
        self.cursor = self.value.len();
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Shared line-editing keys. Returns false for keys it does not handle.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            text: FieldValue::new(""),
            category: 0,
        }
    }

    fn next_category(&mut self, count: usize) {
        if count > 0 {
            self.category = (self.category + 1) % count;
        }
    }

    fn prev_category(&mut self, count: usize) {
        if count > 0 {
            self.category = (self.category + count - 1) % count;
        }
    }
}

impl<B: BlobStore> App<B> {
    fn new(state: AppState<B>, location: StoreLocation) -> Self {
        let status = match state.store().discarded() {
            Some(reason) => format!(
                "Ignoring saved tasks ({}); the next change overwrites them",
                reason
            ),
            None => format!(
                "Loaded {} tasks from {}",
                state.store().len(),
                location.dir.display()
            ),
        };
        App {
            state,
            location,
            selected: 0,
            offset: 0,
            last_save: None,
            status,
            mode: Mode::Normal,
            list_area: Rect::default(),
            hits: Vec::new(),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::Adding(_) | Mode::Editing { .. } => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_selected(),
            KeyCode::Char('n') => {
                self.mode = Mode::Adding(TaskForm::new());
                self.status = "New task (Tab category, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('e') => self.start_edit(),
            KeyCode::Char('d') => self.confirm_delete(),
            KeyCode::Char('a') => self.set_filter(FilterSelector::All),
            KeyCode::Char('i') => self.set_filter(FilterSelector::Incomplete),
            KeyCode::Char('c') => self.set_filter(FilterSelector::Completed),
            KeyCode::Char('f') => {
                let next = self.state.filter().cycle(self.state.categories());
                self.set_filter(next);
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let idx = digit as usize - '1' as usize;
                if let Some(category) = self.state.categories().get(idx).cloned() {
                    self.set_filter(FilterSelector::ByCategory(category));
                }
            }
            KeyCode::Char('K') => self.shift_selected(-1),
            KeyCode::Char('J') => self.shift_selected(1),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::Adding(form) => self.process_add_key(form, key),
            Mode::Editing { id, field } => {
                let id = id.clone();
                self.process_edit_key(&id, field, key)
            }
            Mode::ConfirmDelete { .. } | Mode::Normal => true,
        };
        if !close {
            self.mode = mode;
        }
    }

    fn process_add_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> bool {
        let count = self.state.categories().len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                true
            }
            KeyCode::Tab => {
                form.next_category(count);
                false
            }
            KeyCode::BackTab => {
                form.prev_category(count);
                false
            }
            KeyCode::Enter => self.submit_add(form),
            _ => {
                form.text.handle_key(key);
                false
            }
        }
    }

    fn submit_add(&mut self, form: &TaskForm) -> bool {
        let Some(category) = self.state.categories().get(form.category).cloned() else {
            return false;
        };
        match self.state.add_task(&form.text.value, category) {
            Ok(Some(id)) => {
                self.last_save = Some(Instant::now());
                match self.state.render().position_of(&id) {
                    Some(pos) => {
                        self.selected = pos;
                        self.status = "Added task".into();
                    }
                    None => self.status = "Added task (hidden by current filter)".into(),
                }
                true
            }
            Ok(None) => {
                self.status = "Task text is required".into();
                false
            }
            Err(err) => {
                self.report_failure(err);
                false
            }
        }
    }

    fn process_edit_key(&mut self, id: &TaskId, field: &mut FieldValue, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                match self.state.edit(id, None) {
                    Ok(_) => self.status = "Edit canceled".into(),
                    Err(err) => self.report_failure(err),
                }
                true
            }
            KeyCode::Enter => {
                let result = self.state.edit(id, Some(&field.value));
                self.report(result, "Updated task");
                true
            }
            _ => {
                field.handle_key(key);
                false
            }
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let id = match &self.mode {
            Mode::ConfirmDelete { id } => id.clone(),
            _ => return,
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let result = self.state.apply(&id, RowAction::Delete, None);
                self.report(result, "Deleted task");
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.mouse_down(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => self.mouse_drag(mouse.row),
            MouseEventKind::Up(MouseButton::Left) => self.mouse_up(),
            MouseEventKind::ScrollDown => self.select_next(),
            MouseEventKind::ScrollUp => self.select_prev(),
            _ => {}
        }
    }

    fn mouse_down(&mut self, column: u16, row: u16) {
        let (row_idx, action) = match self.hits.iter().find(|h| contains(h.area, column, row)) {
            Some(hit) => (
                hit.row,
                hit.actions
                    .iter()
                    .find(|(_, area)| contains(*area, column, row))
                    .map(|(action, _)| *action),
            ),
            None => return,
        };
        self.selected = row_idx;
        match action {
            Some(RowAction::Toggle) => self.toggle_selected(),
            Some(RowAction::Edit) => self.start_edit(),
            Some(RowAction::Delete) => self.confirm_delete(),
            None => {
                self.state.press_row(row_idx);
            }
        }
    }

    fn mouse_drag(&mut self, row: u16) {
        if self.state.reorder().is_idle() {
            return;
        }
        let spans = self.row_spans();
        let y = self.pointer_y(row, &spans);
        if let Some(position) = self.state.drag_over(y, &spans) {
            self.selected = position;
            self.status = "Dragging (release to drop)".into();
        }
    }

    fn mouse_up(&mut self) {
        if self.state.reorder().is_idle() {
            return;
        }
        let dragging = self.state.reorder().is_dragging();
        let position = self.state.dragged_position();
        let result = self.state.drop();
        if dragging {
            self.report(result, "Moved task");
            if let Some(position) = position {
                self.selected = position;
            }
        }
    }

    /// Vertical extents of every rendered row in preview order, including
    /// rows scrolled out of view.
    fn row_spans(&self) -> Vec<RowSpan> {
        let count = self.state.render().rows.len();
        let top = self.list_area.y as f32 - (self.offset as f32 * ROW_HEIGHT as f32);
        (0..count)
            .map(|i| RowSpan {
                top: top + i as f32 * ROW_HEIGHT as f32,
                height: ROW_HEIGHT as f32,
            })
            .collect()
    }

    /// A terminal cell has no sub-row precision: aim at the half of the
    /// hovered row that faces away from the dragged row, so hovering a
    /// neighbour is enough to swap with it.
    fn pointer_y(&self, row: u16, spans: &[RowSpan]) -> f32 {
        let dragged = self.state.dragged_position().unwrap_or(self.selected);
        let y = row as f32;
        let height = ROW_HEIGHT as f32;
        match spans.get(dragged) {
            Some(span) if y > span.top => y + height * 0.75,
            Some(span) if y < span.top => y + height * 0.25,
            _ => y + height * 0.5,
        }
    }

    fn selected_row(&self) -> Option<RowView> {
        self.state.render().rows.get(self.selected).cloned()
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn select_next(&mut self) {
        if self.selected + 1 < self.state.render().rows.len() {
            self.selected += 1;
        }
    }

    fn set_filter(&mut self, selector: FilterSelector) {
        self.status = format!("Showing {}", selector);
        self.state.set_filter(selector);
        self.selected = 0;
        self.offset = 0;
    }

    fn toggle_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status = "No task selected".into();
            return;
        };
        let message = if row.completed {
            "Marked task incomplete"
        } else {
            "Completed task"
        };
        let result = self.state.apply(&row.id, RowAction::Toggle, None);
        self.report(result, message);
    }

    fn start_edit(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status = "No task selected to edit".into();
            return;
        };
        let Some(index) = self.state.store().index_of(&row.id) else {
            return;
        };
        let text = self
            .state
            .store()
            .get(index)
            .map(|t| t.text.clone())
            .unwrap_or_default();
        self.mode = Mode::Editing {
            id: row.id,
            field: FieldValue::new(&text),
        };
        self.status = "Editing task (Enter save, Esc cancel)".into();
    }

    fn confirm_delete(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status = "No task selected to delete".into();
            return;
        };
        self.mode = Mode::ConfirmDelete { id: row.id };
        self.status = "Delete task? (y to confirm, n/Esc to cancel)".into();
    }

    /// Moves the selected row within the rendered list, through the same
    /// path a pointer drag takes.
    fn shift_selected(&mut self, delta: isize) {
        let count = self.state.render().rows.len();
        let Some(target) = self
            .selected
            .checked_add_signed(delta)
            .filter(|target| *target < count)
        else {
            return;
        };
        if !self.state.begin_drag(self.selected) {
            return;
        }
        self.state.drag_to(target);
        let result = self.state.drop();
        if self.report(result, "Moved task") {
            self.selected = target;
        }
    }

    fn report(&mut self, result: Result<bool>, message: &str) -> bool {
        match result {
            Ok(true) => {
                self.last_save = Some(Instant::now());
                self.status = message.to_string();
                true
            }
            Ok(false) => {
                self.status = "Nothing changed".into();
                false
            }
            Err(err) => {
                self.report_failure(err);
                false
            }
        }
    }

    fn report_failure(&mut self, err: anyhow::Error) {
        error!("{:#}", err);
        self.status = format!("Save failed: {:#}", err);
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let rendered = self.state.render();
        if self.selected >= rendered.rows.len() {
            self.selected = rendered.rows.len().saturating_sub(1);
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0], &rendered);
        self.draw_progress(f, layout[1], &rendered);
        self.draw_tasks(f, layout[2], &rendered);
        self.draw_footer(f, layout[3]);

        match &self.mode {
            Mode::Adding(form) => self.draw_add_form(f, form),
            Mode::Editing { field, .. } => self.draw_edit_form(f, field),
            Mode::ConfirmDelete { id } => self.draw_confirm(f, id),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, rendered: &RenderedList) {
        let title = Line::from(vec![
            Span::styled(
                "tasklist ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("filter {}", rendered.filter),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                self.location.scope.label(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.dir.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format_elapsed(self.last_save),
                Style::default().fg(Color::Gray),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_progress(&self, f: &mut ratatui::Frame<'_>, area: Rect, rendered: &RenderedList) {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title("Progress"),
            )
            .gauge_style(
                Style::default()
                    .fg(Color::LightGreen)
                    .bg(Color::Rgb(22, 24, 30)),
            )
            .ratio(rendered.progress.ratio())
            .label(rendered.progress.to_string());
        f.render_widget(gauge, area);
    }

    fn draw_tasks(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, rendered: &RenderedList) {
        let title = format!("Tasks ({} shown)", rendered.rows.len());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(area);
        f.render_widget(block, area);
        self.list_area = inner;
        self.hits.clear();

        if rendered.rows.is_empty() {
            let msg = if self.state.store().is_empty() {
                "No tasks yet. Press n to add one."
            } else {
                "No tasks match this filter."
            };
            let paragraph = Paragraph::new(msg)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            f.render_widget(paragraph, inner);
            return;
        }

        let viewport = (inner.height / ROW_HEIGHT) as usize;
        self.offset = adjust_offset(self.selected, self.offset, viewport, 1, rendered.rows.len());
        let dragged = self.state.reorder().dragged().cloned();
        for (idx, row) in rendered
            .rows
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(viewport)
        {
            let row_area = Rect {
                x: inner.x,
                y: inner.y + (idx - self.offset) as u16 * ROW_HEIGHT,
                width: inner.width,
                height: ROW_HEIGHT,
            };
            let is_dragged = dragged.as_ref() == Some(&row.id);
            let hit = draw_row(f, row_area, idx, row, idx == self.selected, is_dragged);
            self.hits.push(hit);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn draw_add_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let category = self
            .state
            .categories()
            .get(form.category)
            .map(|c| c.to_string())
            .unwrap_or_default();
        let lines = vec![
            field_line("Text", &form.text),
            Line::from(vec![
                Span::styled("Category: ", label_style()),
                Span::styled(
                    format!("◀ {} ▶", category),
                    Style::default().fg(Color::LightMagenta),
                ),
            ]),
            Line::raw(""),
            Line::styled(
                "Tab/Shift-Tab category  Enter save  Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ];
        draw_popup(f, "New Task", Color::LightCyan, lines);
    }

    fn draw_edit_form(&self, f: &mut ratatui::Frame<'_>, field: &FieldValue) {
        let lines = vec![
            field_line("Text", field),
            Line::raw(""),
            Line::styled("Enter save  Esc cancel", Style::default().fg(Color::DarkGray)),
        ];
        draw_popup(f, "Edit Task", Color::LightYellow, lines);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, id: &TaskId) {
        let text = self
            .state
            .store()
            .index_of(id)
            .and_then(|idx| self.state.store().get(idx))
            .map(|t| t.text.clone())
            .unwrap_or_default();
        let lines = vec![
            Line::from(vec![
                Span::raw("Delete "),
                Span::styled(
                    format!("\"{}\"", text),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw("?"),
            ]),
            Line::raw(""),
            Line::styled("y confirm  n/Esc cancel", Style::default().fg(Color::DarkGray)),
        ];
        draw_popup(f, "Confirm Delete", Color::LightRed, lines);
    }
}

fn draw_row(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    idx: usize,
    row: &RowView,
    selected: bool,
    dragged: bool,
) -> RowHit {
    let actions: Vec<(RowAction, String)> = row
        .actions()
        .map(|(action, label)| (action, format!("[{}]", label)))
        .collect();
    let actions_width: u16 = actions
        .iter()
        .map(|(_, label)| label.chars().count() as u16 + 1)
        .sum();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(actions_width)])
        .split(area);

    let accent = Color::Rgb(row.accent.r, row.accent.g, row.accent.b);
    let mut base = Style::default().fg(Color::Black).bg(accent);
    if selected {
        base = base.add_modifier(Modifier::BOLD);
    }
    if dragged {
        base = base.add_modifier(Modifier::REVERSED);
    }
    let text_style = if row.completed {
        base.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM)
    } else {
        base
    };
    let pointer = if selected { "▶ " } else { "  " };
    let label = truncate_text(&row.label, (chunks[0].width as usize).saturating_sub(6));
    let line = Line::from(vec![
        Span::styled(pointer, base),
        Span::styled(format!("{} ", row.marker()), base),
        Span::styled(label, text_style),
    ]);
    f.render_widget(Paragraph::new(line).style(base), chunks[0]);

    let mut spans = Vec::new();
    let mut hit_actions = Vec::new();
    let mut x = chunks[1].x;
    for (action, label) in actions {
        let width = label.chars().count() as u16;
        spans.push(Span::raw(" "));
        x = x.saturating_add(1);
        let target = Rect {
            x,
            y: area.y,
            width,
            height: area.height,
        }
        .intersection(chunks[1]);
        if target.width > 0 {
            hit_actions.push((action, target));
        }
        spans.push(Span::styled(label, action_style(action, base)));
        x = x.saturating_add(width);
    }
    f.render_widget(Paragraph::new(Line::from(spans)).style(base), chunks[1]);

    RowHit {
        row: idx,
        area,
        actions: hit_actions,
    }
}

fn draw_popup(f: &mut ratatui::Frame<'_>, title: &str, accent: Color, lines: Vec<Line<'static>>) {
    let area = centered_rect(60, 30, f.size());
    let dialog = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(Span::styled(
                title.to_string(),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn footer_help_line() -> Line<'static> {
    Line::from(vec![
        Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
        Span::raw(" select  "),
        Span::styled("space", Style::default().fg(Color::LightGreen)),
        Span::raw(" toggle  "),
        Span::styled("n", Style::default().fg(Color::LightMagenta)),
        Span::raw(" new  "),
        Span::styled("e", Style::default().fg(Color::LightYellow)),
        Span::raw(" edit  "),
        Span::styled("d", Style::default().fg(Color::LightRed)),
        Span::raw(" delete  "),
        Span::styled("a i c 1-9 f", Style::default().fg(Color::LightCyan)),
        Span::raw(" filter  "),
        Span::styled("J K / drag", Style::default().fg(Color::LightGreen)),
        Span::raw(" reorder  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ])
}

fn action_style(action: RowAction, base: Style) -> Style {
    let color = match action {
        RowAction::Toggle => Color::Green,
        RowAction::Edit => Color::Blue,
        RowAction::Delete => Color::Red,
    };
    base.fg(color).add_modifier(Modifier::BOLD)
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM)
}

fn field_line(label: &str, field: &FieldValue) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(field.with_caret(), Style::default().fg(Color::Cyan)),
    ])
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    debug!("terminal ready");
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn prev_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(cursor)
}

fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn format_elapsed(last: Option<Instant>) -> String {
    let Some(last) = last else {
        return "no changes yet".into();
    };
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("saved {}s ago", secs)
    } else if secs < 3600 {
        format!("saved {}m ago", secs / 60)
    } else {
        format!("saved {}h ago", secs / 3600)
    }
}
