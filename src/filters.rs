//! Coupling between the fiscal-year picker and the explicit date range.
//!
//! Both inputs write the same two fields. [`ChangeSource`] records which one
//! drove the last change so that a manual date edit is never snapped back to
//! the previously selected fiscal year's range.

use crate::fiscal::FiscalYear;
use crate::schema::{Choice, Dimension, FilterSelection};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Idle; the next change comes from the user.
    User,
    /// The coordinator itself is overwriting the date range.
    System,
    /// The user typed a date directly instead of picking a fiscal year.
    UserEditedDates,
}

/// A single field update coming from the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterUpdate {
    Dimension(Dimension, Choice),
    FiscalYear(Choice<FiscalYear>),
    StartDate(Option<NaiveDate>),
    EndDate(Option<NaiveDate>),
}

impl FilterUpdate {
    fn is_date_edit(&self) -> bool {
        matches!(self, FilterUpdate::StartDate(_) | FilterUpdate::EndDate(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCoordinator {
    selection: FilterSelection,
    source: ChangeSource,
}

impl Default for FilterCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCoordinator {
    pub fn new() -> Self {
        Self {
            selection: FilterSelection::default(),
            source: ChangeSource::User,
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn source(&self) -> ChangeSource {
        self.source
    }

    /// Applies one field update and settles the change source.
    pub fn apply(&mut self, update: FilterUpdate) -> &FilterSelection {
        let mut next = self.selection.clone();
        let is_date_edit = update.is_date_edit();

        match update {
            FilterUpdate::Dimension(dimension, choice) => {
                *next.choice_mut(dimension) = choice;
            }
            FilterUpdate::FiscalYear(Choice::Only(fiscal_year)) => {
                self.source = ChangeSource::System;
                next.fiscal_year = Choice::Only(fiscal_year);
                next.start_date = Some(fiscal_year.start_date());
                next.end_date = Some(fiscal_year.end_date());
            }
            FilterUpdate::FiscalYear(Choice::All) => {
                next.fiscal_year = Choice::All;
                if self.source != ChangeSource::UserEditedDates {
                    self.source = ChangeSource::System;
                    next.start_date = None;
                    next.end_date = None;
                }
            }
            FilterUpdate::StartDate(date) => {
                next.start_date = date;
                self.mark_manual_dates(&mut next);
            }
            FilterUpdate::EndDate(date) => {
                next.end_date = date;
                self.mark_manual_dates(&mut next);
            }
        }

        self.settle(is_date_edit, &next);
        self.selection = next;
        &self.selection
    }

    /// Resets every field. Runs as a system-sourced change.
    pub fn clear(&mut self) -> &FilterSelection {
        self.source = ChangeSource::System;
        self.selection = FilterSelection::default();
        self.source = ChangeSource::User;
        &self.selection
    }

    /// Overwrites the selection without any fiscal-year coupling; used when
    /// cascade reconciliation relaxes dimension choices.
    pub(crate) fn replace_dimensions(&mut self, reconciled: &FilterSelection) {
        for dimension in Dimension::CASCADE_ORDER {
            *self.selection.choice_mut(dimension) = reconciled.choice(dimension).clone();
        }
    }

    /// A hand-typed date detaches the range from any selected fiscal year.
    fn mark_manual_dates(&mut self, next: &mut FilterSelection) {
        if matches!(
            self.source,
            ChangeSource::User | ChangeSource::UserEditedDates
        ) {
            self.source = ChangeSource::UserEditedDates;
            next.fiscal_year = Choice::All;
        }
    }

    fn settle(&mut self, is_date_edit: bool, next: &FilterSelection) {
        let before = self.source;
        match self.source {
            ChangeSource::System => self.source = ChangeSource::User,
            ChangeSource::UserEditedDates if is_date_edit && next.fiscal_year.is_all() => {
                self.source = ChangeSource::User
            }
            _ => {}
        }
        if before != self.source {
            debug!("Filter change source {:?} -> {:?}", before, self.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_selecting_fiscal_year_sets_range() {
        let mut coordinator = FilterCoordinator::new();
        let fy = FiscalYear::starting(2022);
        let selection = coordinator.apply(FilterUpdate::FiscalYear(Choice::Only(fy)));

        assert_eq!(selection.start_date, Some(ymd(2022, 4, 1)));
        assert_eq!(selection.end_date, Some(ymd(2023, 3, 31)));
        assert_eq!(selection.fiscal_year, Choice::Only(fy));
        assert_eq!(coordinator.source(), ChangeSource::User);
    }

    #[test]
    fn test_manual_date_edit_detaches_fiscal_year() {
        let mut coordinator = FilterCoordinator::new();
        coordinator.apply(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2022))));
        let selection = coordinator.apply(FilterUpdate::StartDate(Some(ymd(2022, 5, 1))));

        assert_eq!(selection.start_date, Some(ymd(2022, 5, 1)));
        assert_eq!(selection.end_date, Some(ymd(2023, 3, 31)));
        assert!(selection.fiscal_year.is_all());
        assert_eq!(coordinator.source(), ChangeSource::User);
    }

    #[test]
    fn test_selecting_all_fiscal_years_clears_dates() {
        let mut coordinator = FilterCoordinator::new();
        coordinator.apply(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2021))));
        let selection = coordinator.apply(FilterUpdate::FiscalYear(Choice::All));

        assert_eq!(selection.start_date, None);
        assert_eq!(selection.end_date, None);
        assert_eq!(coordinator.source(), ChangeSource::User);
    }

    #[test]
    fn test_end_date_edit_without_fiscal_year() {
        let mut coordinator = FilterCoordinator::new();
        let selection = coordinator.apply(FilterUpdate::EndDate(Some(ymd(2023, 1, 31))));

        assert_eq!(selection.start_date, None);
        assert_eq!(selection.end_date, Some(ymd(2023, 1, 31)));
        assert!(selection.fiscal_year.is_all());
    }

    #[test]
    fn test_dimension_update_touches_only_that_dimension() {
        let mut coordinator = FilterCoordinator::new();
        coordinator.apply(FilterUpdate::FiscalYear(Choice::Only(FiscalYear::starting(2022))));
        let before = coordinator.selection().clone();
        let selection = coordinator.apply(FilterUpdate::Dimension(
            Dimension::State,
            Choice::only("Tamil Nadu"),
        ));

        assert_eq!(selection.state, Choice::only("Tamil Nadu"));
        assert_eq!(selection.start_date, before.start_date);
        assert_eq!(selection.fiscal_year, before.fiscal_year);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut coordinator = FilterCoordinator::new();
        coordinator.apply(FilterUpdate::Dimension(Dimension::Broker, Choice::only("Broker X")));
        coordinator.apply(FilterUpdate::StartDate(Some(ymd(2022, 1, 1))));
        let selection = coordinator.clear();

        assert!(selection.is_default());
        assert_eq!(coordinator.source(), ChangeSource::User);
    }
}
