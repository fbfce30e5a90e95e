use chrono::{Datelike, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn next(self) -> Self {
        match self {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        }
    }

    fn previous(self) -> Self {
        match self {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        }
    }

    fn digits(self) -> usize {
        match self {
            DatePart::Year => 4,
            DatePart::Month | DatePart::Day => 2,
        }
    }

    fn placeholder(self) -> &'static str {
        match self {
            DatePart::Year => "[YYYY]",
            DatePart::Month => "[MM]",
            DatePart::Day => "[DD]",
        }
    }
}

/// Digit-by-digit editor for one calendar date.
pub struct DateInputState {
    pub date: NaiveDate,
    pub editing: bool,
    pub date_part: DatePart,
    pending: String,
}

impl DateInputState {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            editing: false,
            date_part: DatePart::Year,
            pending: String::new(),
        }
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
        self.date_part = DatePart::Year;
        self.pending.clear();
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
        self.pending.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.pending.push(c);
                if self.pending.len() == self.date_part.digits() {
                    self.commit_pending();
                }
            }
            KeyCode::Backspace => {
                self.pending.pop();
            }
            KeyCode::Right => {
                self.date_part = self.date_part.next();
                self.pending.clear();
            }
            KeyCode::Left => {
                self.date_part = self.date_part.previous();
                self.pending.clear();
            }
            _ => {}
        }
    }

    /// Apply the typed digits if they form a real date; otherwise keep the old one.
    fn commit_pending(&mut self) {
        let value: u32 = match self.pending.parse() {
            Ok(value) => value,
            Err(_) => {
                self.pending.clear();
                return;
            }
        };
        let (year, month, day) = (self.date.year(), self.date.month(), self.date.day());

        let candidate = match self.date_part {
            DatePart::Year if (1900..=2100).contains(&value) => NaiveDate::from_ymd_opt(value as i32, month, day),
            DatePart::Month => NaiveDate::from_ymd_opt(year, value, day),
            DatePart::Day => NaiveDate::from_ymd_opt(year, month, value),
            _ => None,
        };
        if let Some(date) = candidate {
            self.date = date;
            if self.date_part != DatePart::Day {
                self.date_part = self.date_part.next();
            }
        }
        self.pending.clear();
    }

    pub fn display(&self) -> String {
        let (year, month, day) = (
            format!("{:04}", self.date.year()),
            format!("{:02}", self.date.month()),
            format!("{:02}", self.date.day()),
        );
        if !self.editing {
            return format!("{year}-{month}-{day}");
        }

        let cursor = if self.pending.is_empty() {
            self.date_part.placeholder().to_string()
        } else {
            format!("[{}]", self.pending)
        };
        match self.date_part {
            DatePart::Year => format!("{year}{cursor}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{cursor}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{cursor}"),
        }
    }
}
