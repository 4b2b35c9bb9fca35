use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::error::{Error, Result};
use crate::form::{Field, FormAction, FormState, Saved};
use crate::models::{ApplicationStatus, JobApplication, Priority};
use crate::store::ApplicationStore;

// --- Browse screen ---

struct BrowseState {
    records: Vec<JobApplication>,
    selected: usize,
    scroll_offset: u16,
    status_filter: Option<ApplicationStatus>,
    notice: Option<String>,
}

impl BrowseState {
    fn current(&self) -> Option<&JobApplication> {
        self.records.get(self.selected)
    }

    fn next(&mut self) {
        if !self.records.is_empty() && self.selected < self.records.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Mutations never patch the local list; the store is the source of
    /// truth, so reload it wholesale.
    fn refetch(&mut self, store: &dyn ApplicationStore) {
        match fetch(store, self.status_filter) {
            Ok(records) => {
                self.records = records;
                if self.selected >= self.records.len() {
                    self.selected = self.records.len().saturating_sub(1);
                }
            }
            Err(err) => self.notice = Some(err.to_string()),
        }
    }
}

fn fetch(
    store: &dyn ApplicationStore,
    status: Option<ApplicationStatus>,
) -> Result<Vec<JobApplication>> {
    match status {
        Some(status) => store.list_by_status(status),
        None => store.list(),
    }
}

pub fn run_browse(store: &dyn ApplicationStore, status: Option<ApplicationStatus>) -> Result<()> {
    let records = fetch(store, status)?;
    if records.is_empty() {
        println!("No applications found.");
        return Ok(());
    }

    let mut state = BrowseState {
        records,
        selected: 0,
        scroll_offset: 0,
        status_filter: status,
        notice: None,
    };

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = browse_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn browse_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut BrowseState,
    store: &dyn ApplicationStore,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw_browse(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('f') => {
                    state.notice = None;
                    state.refetch(store);
                }
                KeyCode::Char('n') => {
                    let mut screen = FormScreen::open_add();
                    if let Some(saved) = form_loop(terminal, &mut screen, store)? {
                        state.notice = Some(format!("Saved {}", saved.id()));
                        state.refetch(store);
                    }
                }
                KeyCode::Char('e') => {
                    if let Some(record) = state.current().cloned() {
                        let mut screen = FormScreen::open_edit(&record);
                        if let Some(saved) = form_loop(terminal, &mut screen, store)? {
                            state.notice = Some(format!("Saved {}", saved.id()));
                            state.refetch(store);
                        }
                    }
                }
                KeyCode::Char('D') => {
                    let id = state.current().and_then(|record| record.id.clone());
                    if let Some(id) = id {
                        match store.delete(&id) {
                            Ok(()) => {
                                state.notice = Some("Deleted.".to_string());
                                state.refetch(store);
                            }
                            Err(err) => state.notice = Some(err.to_string()),
                        }
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(status) = quick_status(c) {
                        if let Some(mut record) = state.current().cloned() {
                            if let Some(id) = record.id.clone() {
                                record.status = status;
                                match store.update(&id, &record) {
                                    Ok(()) => {
                                        state.notice = Some(format!("Status set to {}", status));
                                        state.refetch(store);
                                    }
                                    Err(err) => state.notice = Some(err.to_string()),
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn quick_status(c: char) -> Option<ApplicationStatus> {
    match c {
        'a' => Some(ApplicationStatus::Applied),
        's' => Some(ApplicationStatus::InterviewScheduled),
        'i' => Some(ApplicationStatus::Interviewed),
        'o' => Some(ApplicationStatus::Offer),
        'x' => Some(ApplicationStatus::Rejected),
        'c' => Some(ApplicationStatus::Accepted),
        _ => None,
    }
}

fn draw_browse(frame: &mut Frame, state: &BrowseState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(frame.area());

    let items: Vec<ListItem> = state
        .records
        .iter()
        .map(|record| {
            ListItem::new(format!(
                "{} {:<10} {:<20} {}",
                status_icon(record.status),
                record.application_date,
                clip(&record.company_name, 18),
                clip(&record.job_title, 24),
            ))
        })
        .collect();

    let title = match state.status_filter {
        Some(status) => format!(" Applications - {} ({}) ", status, state.records.len()),
        None => format!(" Applications ({}) ", state.records.len()),
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let detail = match state.current() {
        Some(record) => build_detail(record),
        None => Text::raw("No application selected"),
    };
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail_widget, chunks[1]);

    let footer_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let footer = match &state.notice {
        Some(notice) => Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " j/k:move  J/K:scroll  a/s/i/o/x/c:status  e:edit  n:new  D:delete  f:refresh  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, footer_area[1]);
}

fn status_icon(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Applied => "+",
        ApplicationStatus::InterviewScheduled => "*",
        ApplicationStatus::Interviewed => "i",
        ApplicationStatus::Offer => "$",
        ApplicationStatus::Rejected => "x",
        ApplicationStatus::Accepted => "#",
    }
}

fn status_style(status: ApplicationStatus) -> Style {
    match status {
        ApplicationStatus::Applied => Style::default().fg(Color::Cyan),
        ApplicationStatus::InterviewScheduled => Style::default().fg(Color::Yellow),
        ApplicationStatus::Interviewed => Style::default().fg(Color::Blue),
        ApplicationStatus::Offer => Style::default().fg(Color::Green),
        ApplicationStatus::Rejected => Style::default().fg(Color::Red),
        ApplicationStatus::Accepted => Style::default().fg(Color::LightGreen),
    }
}

fn build_detail(record: &JobApplication) -> Text<'static> {
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        record.job_title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let company = if record.company_industry.is_empty() {
        format!("at {}", record.company_name)
    } else {
        format!("at {} ({})", record.company_name, record.company_industry)
    };
    lines.push(Line::from(company));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", record.status),
        status_style(record.status),
    )));
    lines.push(Line::from(format!("Priority: {}", record.priority_level)));
    lines.push(Line::from(""));

    let mut field = |label: &str, value: &str| {
        if !value.is_empty() {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    };
    field("Applied", &record.application_date);
    field("Deadline", &record.deadline);
    field("Follow-up", &record.follow_up_date);
    field("Interview", &record.interview_date);
    field("Location", &record.location);
    field("Type", &record.job_type);
    field("Platform", &record.application_platform);
    field("Link", &record.job_posting_link);
    field("Salary", &record.salary_range);
    field("Contact", &record.contact_person);
    field("Email", &record.contact_email);
    field("Phone", &record.contact_phone);
    field("Resume", &record.resume_version);
    field("Referral", &record.referral);

    if record.cover_letter {
        lines.push(Line::from("Cover letter: yes"));
    }
    if !record.skills_required.is_empty() {
        lines.push(Line::from(format!(
            "Skills: {}",
            record.skills_required.join(", ")
        )));
    }

    let offer_relevant = matches!(
        record.status,
        ApplicationStatus::Offer | ApplicationStatus::Accepted
    );
    if offer_relevant {
        if let Some(offer) = &record.offer_details {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "OFFER",
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Green),
            )));
            if !offer.salary.is_empty() {
                lines.push(Line::from(format!("  Salary: {}", offer.salary)));
            }
            if !offer.joining_date.is_empty() {
                lines.push(Line::from(format!("  Joining: {}", offer.joining_date)));
            }
            if !offer.benefits.is_empty() {
                lines.push(Line::from(format!("  Benefits: {}", offer.benefits.join(", "))));
            }
        }
    }

    if !record.job_description_summary.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "SUMMARY",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&record.job_description_summary, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }
    if !record.notes.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "NOTES",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&record.notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

// --- Form screen ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormRow {
    Text(Field),
    Status,
    Priority,
    CoverLetter,
    Skills,
    Benefits,
}

struct FormScreen {
    form: FormState,
    cursor: usize,
    notice: Option<String>,
}

impl FormScreen {
    fn open_add() -> Self {
        Self {
            form: FormState::new(),
            cursor: 0,
            notice: None,
        }
    }

    fn open_edit(record: &JobApplication) -> Self {
        Self {
            form: FormState::for_record(record),
            cursor: 0,
            notice: None,
        }
    }

    /// The visible rows; the offer section appears only while the draft
    /// status warrants it.
    fn rows(&self) -> Vec<FormRow> {
        let mut rows = vec![
            FormRow::Text(Field::CompanyName),
            FormRow::Text(Field::CompanyIndustry),
            FormRow::Text(Field::JobTitle),
            FormRow::Text(Field::JobType),
            FormRow::Text(Field::Location),
            FormRow::Status,
            FormRow::Priority,
            FormRow::Text(Field::ApplicationDate),
            FormRow::Text(Field::Deadline),
            FormRow::Text(Field::FollowUpDate),
            FormRow::Text(Field::InterviewDate),
            FormRow::Text(Field::JobPostingLink),
            FormRow::Text(Field::SalaryRangeMin),
            FormRow::Text(Field::SalaryRangeMax),
            FormRow::Text(Field::ContactPerson),
            FormRow::Text(Field::ContactEmail),
            FormRow::Text(Field::ContactPhone),
            FormRow::Text(Field::JobDescriptionSummary),
            FormRow::Text(Field::Notes),
            FormRow::Text(Field::ResumeVersion),
            FormRow::Text(Field::Referral),
            FormRow::Text(Field::ApplicationPlatform),
            FormRow::CoverLetter,
            FormRow::Skills,
        ];
        if self.form.offer_section_visible() {
            rows.push(FormRow::Text(Field::OfferSalary));
            rows.push(FormRow::Text(Field::OfferJoiningDate));
            rows.push(FormRow::Benefits);
        }
        rows
    }

    fn current_row(&self) -> FormRow {
        let rows = self.rows();
        rows[self.cursor.min(rows.len() - 1)]
    }

    fn next_row(&mut self) {
        if self.cursor + 1 < self.rows().len() {
            self.cursor += 1;
        }
    }

    fn prev_row(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    // Status changes can hide the offer rows out from under the cursor.
    fn clamp_cursor(&mut self) {
        let len = self.rows().len();
        if self.cursor >= len {
            self.cursor = len - 1;
        }
    }
}

pub fn run_form(
    store: &dyn ApplicationStore,
    record: Option<&JobApplication>,
) -> Result<Option<Saved>> {
    let mut screen = match record {
        Some(record) => FormScreen::open_edit(record),
        None => FormScreen::open_add(),
    };

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = form_loop(&mut terminal, &mut screen, store);

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn form_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    screen: &mut FormScreen,
    store: &dyn ApplicationStore,
) -> Result<Option<Saved>> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        screen.clamp_cursor();
        list_state.select(Some(screen.cursor));
        terminal.draw(|frame| draw_form(frame, screen, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            // Closing in any way discards the draft.
            if key.code == KeyCode::Esc {
                screen.form.reset();
                return Ok(None);
            }
            if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
                match screen.form.submit(store) {
                    Ok(saved) => {
                        screen.form.reset();
                        return Ok(Some(saved));
                    }
                    Err(Error::Validation(_)) => {
                        screen.notice =
                            Some(format!("{} field(s) need attention", screen.form.errors.len()));
                    }
                    Err(err) => screen.notice = Some(err.to_string()),
                }
                continue;
            }

            match key.code {
                KeyCode::Up | KeyCode::BackTab => screen.prev_row(),
                KeyCode::Down | KeyCode::Tab => screen.next_row(),
                _ => handle_row_key(screen, key.code, key.modifiers),
            }
        }
    }
}

fn handle_row_key(screen: &mut FormScreen, code: KeyCode, modifiers: KeyModifiers) {
    let typed = match code {
        KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => Some(c),
        _ => None,
    };

    match screen.current_row() {
        FormRow::Text(field) => match code {
            KeyCode::Char(_) => {
                if let Some(c) = typed {
                    let mut value = field.get(&screen.form.draft).to_string();
                    value.push(c);
                    screen.form.apply(FormAction::Set(field, value));
                }
            }
            KeyCode::Backspace => {
                let mut value = field.get(&screen.form.draft).to_string();
                value.pop();
                screen.form.apply(FormAction::Set(field, value));
            }
            KeyCode::Enter => screen.next_row(),
            _ => {}
        },
        FormRow::Status => match code {
            KeyCode::Left => {
                let status = cycle(&ApplicationStatus::ALL, screen.form.draft.status, -1);
                screen.form.apply(FormAction::SetStatus(status));
            }
            KeyCode::Right | KeyCode::Char(' ') => {
                let status = cycle(&ApplicationStatus::ALL, screen.form.draft.status, 1);
                screen.form.apply(FormAction::SetStatus(status));
            }
            KeyCode::Enter => screen.next_row(),
            _ => {}
        },
        FormRow::Priority => match code {
            KeyCode::Left => {
                let priority = cycle(&Priority::ALL, screen.form.draft.priority_level, -1);
                screen.form.apply(FormAction::SetPriority(priority));
            }
            KeyCode::Right | KeyCode::Char(' ') => {
                let priority = cycle(&Priority::ALL, screen.form.draft.priority_level, 1);
                screen.form.apply(FormAction::SetPriority(priority));
            }
            KeyCode::Enter => screen.next_row(),
            _ => {}
        },
        FormRow::CoverLetter => match code {
            KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                let flag = !screen.form.draft.cover_letter;
                screen.form.apply(FormAction::SetCoverLetter(flag));
            }
            KeyCode::Enter => screen.next_row(),
            _ => {}
        },
        FormRow::Skills => match code {
            KeyCode::Enter => screen.form.apply(FormAction::CommitSkill),
            KeyCode::Char(_) => {
                if let Some(c) = typed {
                    let mut buffer = screen.form.skill_input.clone();
                    buffer.push(c);
                    screen.form.apply(FormAction::SkillInput(buffer));
                }
            }
            KeyCode::Backspace => {
                if screen.form.skill_input.is_empty() {
                    if let Some(last) = screen.form.draft.skills_required.last().cloned() {
                        screen.form.apply(FormAction::RemoveSkill(last));
                    }
                } else {
                    let mut buffer = screen.form.skill_input.clone();
                    buffer.pop();
                    screen.form.apply(FormAction::SkillInput(buffer));
                }
            }
            _ => {}
        },
        FormRow::Benefits => match code {
            KeyCode::Enter => screen.form.apply(FormAction::CommitBenefit),
            KeyCode::Char(_) => {
                if let Some(c) = typed {
                    let mut buffer = screen.form.benefit_input.clone();
                    buffer.push(c);
                    screen.form.apply(FormAction::BenefitInput(buffer));
                }
            }
            KeyCode::Backspace => {
                if screen.form.benefit_input.is_empty() {
                    let last = screen.form.draft.offer_details.benefits.last().cloned();
                    if let Some(last) = last {
                        screen.form.apply(FormAction::RemoveBenefit(last));
                    }
                } else {
                    let mut buffer = screen.form.benefit_input.clone();
                    buffer.pop();
                    screen.form.apply(FormAction::BenefitInput(buffer));
                }
            }
            _ => {}
        },
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, step: isize) -> T {
    let pos = all.iter().position(|item| *item == current).unwrap_or(0) as isize;
    let len = all.len() as isize;
    all[(pos + step).rem_euclid(len) as usize]
}

fn draw_form(frame: &mut Frame, screen: &FormScreen, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let items: Vec<ListItem> = screen
        .rows()
        .into_iter()
        .map(|row| ListItem::new(form_row_line(screen, row)))
        .collect();

    let title = if screen.form.is_edit() {
        " Edit Application "
    } else {
        " Add Application "
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], list_state);

    let footer = match &screen.notice {
        Some(notice) => Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " Tab/arrows:move  Left/Right:cycle  Space:toggle  Enter:add item  Ctrl-S:save  Esc:cancel",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, chunks[1]);
}

fn form_row_line(screen: &FormScreen, row: FormRow) -> Line<'static> {
    let label = |text: &str| {
        Span::styled(format!("{:<18}", text), Style::default().fg(Color::Cyan))
    };

    match row {
        FormRow::Text(field) => {
            let mut spans = vec![
                label(field.label()),
                Span::raw(field.get(&screen.form.draft).to_string()),
            ];
            if let Some(message) = screen.form.errors.get(field.key()) {
                spans.push(Span::styled(
                    format!("  {}", message),
                    Style::default().fg(Color::Red),
                ));
            }
            Line::from(spans)
        }
        FormRow::Status => Line::from(vec![
            label("Status"),
            Span::styled(
                format!("< {} >", screen.form.draft.status),
                status_style(screen.form.draft.status),
            ),
        ]),
        FormRow::Priority => Line::from(vec![
            label("Priority"),
            Span::raw(format!("< {} >", screen.form.draft.priority_level)),
        ]),
        FormRow::CoverLetter => Line::from(vec![
            label("Cover Letter"),
            Span::raw(if screen.form.draft.cover_letter { "[x]" } else { "[ ]" }),
        ]),
        FormRow::Skills => chip_line("Skills", &screen.form.draft.skills_required, &screen.form.skill_input),
        FormRow::Benefits => chip_line(
            "Benefits",
            &screen.form.draft.offer_details.benefits,
            &screen.form.benefit_input,
        ),
    }
}

fn chip_line(label_text: &str, entries: &[String], buffer: &str) -> Line<'static> {
    let mut chips = String::new();
    for entry in entries {
        chips.push_str(&format!("[{}] ", entry));
    }
    Line::from(vec![
        Span::styled(format!("{:<18}", label_text), Style::default().fg(Color::Cyan)),
        Span::raw(chips),
        Span::styled(format!("+ {}_", buffer), Style::default().fg(Color::Yellow)),
    ])
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
