//! 日付範囲の解決とアーカイブ検索用の分割

use std::fmt;

use chrono::{Duration, Local, NaiveDate};

use crate::error::FetchError;

use super::protocol::{ARCHIVE_WINDOW_DAYS, DATE_FORMAT};

/// 日付範囲 (`start <= end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FetchError> {
        if start > end {
            return Err(FetchError::Usage(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// 14日ごとの検索窓に分割する (新しい順)
    pub fn windows(self) -> DateWindows {
        DateWindows::new(self.start, self.end)
    }

    pub fn portal_start(&self) -> String {
        format_portal_date(self.start)
    }

    pub fn portal_end(&self) -> String {
        format_portal_date(self.end)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// コマンドラインで指定された日付条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// 開始日が無いときの遡る日数
    pub days: Option<u32>,
}

impl DateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    /// 今日を基準に解決する
    pub fn resolve(&self) -> Result<DateWindow, FetchError> {
        self.resolve_at(Local::now().date_naive())
    }

    /// 終了日の既定値は `today`。開始日は明示指定、なければ `end - days`
    pub fn resolve_at(&self, today: NaiveDate) -> Result<DateWindow, FetchError> {
        let end = self.end.unwrap_or(today);
        let start = match (self.start, self.days) {
            (Some(start), _) => start,
            (None, Some(days)) => end
                .checked_sub_signed(Duration::days(i64::from(days)))
                .ok_or_else(|| FetchError::Usage(format!("days out of range: {}", days)))?,
            (None, None) => return Err(FetchError::Usage("no start date".into())),
        };
        DateWindow::new(start, end)
    }
}

/// 終了日から14日ずつ遡る検索窓の列
///
/// 各窓の `end` は直前 (より新しい) 窓の `start` と同じ日になる。
/// 最も古い窓の `start` は全体の開始日で切り詰める。一度きりのイテレータ。
#[derive(Debug, Clone)]
pub struct DateWindows {
    start: NaiveDate,
    end: NaiveDate,
    ptr: NaiveDate,
    started: bool,
}

impl DateWindows {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            ptr: end,
            started: false,
        }
    }
}

impl Iterator for DateWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<Self::Item> {
        // 開始日ちょうどで終わった場合、1日だけの窓を重ねて出さない
        let more = self.ptr > self.start || (!self.started && self.ptr == self.start);
        if !more {
            return None;
        }
        self.started = true;
        // 日付の下限を越えるときは開始日で止める
        self.ptr = self
            .ptr
            .checked_sub_signed(Duration::days(ARCHIVE_WINDOW_DAYS))
            .unwrap_or(self.start);
        let window = DateWindow {
            start: self.ptr.max(self.start),
            end: self.end,
        };
        self.end = self.ptr;
        Some(window)
    }
}
