//! Model specification: typed term constructors and the builder that replaces
//! a textual formula surface.
//!
//! A specification names the response column and carries one growth term plus
//! zero or more season, holiday and regressor terms. `ModelSpec::auto`
//! synthesizes default terms per series from its span and sampling interval.

use crate::error::SpecificationError;
use crate::series::MICROS_PER_DAY;
use chrono::NaiveDate;

/// Long-run trend shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthKind {
    #[default]
    Linear,
    /// Capacity-bounded logistic growth; requires `capacity`.
    Logistic,
    /// Constant trend, no slope and no changepoints.
    Flat,
}

/// Whether a term's effect is added to, or scales, the trend level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermMode {
    #[default]
    Additive,
    Multiplicative,
}

/// Growth term: trend shape and changepoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Growth {
    pub kind: GrowthKind,
    /// Number of candidate changepoint locations.
    pub n_changepoints: usize,
    /// Fraction of the training span over which candidates are placed.
    pub changepoint_range: f64,
    /// Prior scale for slope changes; larger = weaker regularization.
    pub changepoint_prior_scale: f64,
    /// Upper bound for logistic growth, in response units.
    pub capacity: Option<f64>,
}

impl Default for Growth {
    fn default() -> Self {
        Self {
            kind: GrowthKind::Linear,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            capacity: None,
        }
    }
}

impl Growth {
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn logistic(capacity: f64) -> Self {
        Self {
            kind: GrowthKind::Logistic,
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn flat() -> Self {
        Self {
            kind: GrowthKind::Flat,
            n_changepoints: 0,
            ..Self::default()
        }
    }

    pub fn with_changepoints(mut self, n: usize) -> Self {
        self.n_changepoints = n;
        self
    }

    pub fn with_changepoint_range(mut self, range: f64) -> Self {
        self.changepoint_range = range;
        self
    }

    pub fn with_prior_scale(mut self, scale: f64) -> Self {
        self.changepoint_prior_scale = scale;
        self
    }

    fn validate(&self) -> Result<(), SpecificationError> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(SpecificationError::InvalidParameter {
                param: "changepoint_range".into(),
                value: format!("{}", self.changepoint_range),
                reason: "must be in (0, 1]".into(),
            });
        }
        if self.changepoint_prior_scale <= 0.0 {
            return Err(SpecificationError::InvalidParameter {
                param: "changepoint_prior_scale".into(),
                value: format!("{}", self.changepoint_prior_scale),
                reason: "must be positive".into(),
            });
        }
        if self.kind == GrowthKind::Logistic {
            match self.capacity {
                Some(cap) if cap > 0.0 => {}
                Some(cap) => {
                    return Err(SpecificationError::InvalidParameter {
                        param: "capacity".into(),
                        value: format!("{}", cap),
                        reason: "must be positive".into(),
                    })
                }
                None => {
                    return Err(SpecificationError::InvalidParameter {
                        param: "capacity".into(),
                        value: "None".into(),
                        reason: "logistic growth requires a capacity".into(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Season term: periodic Fourier-basis component.
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub name: String,
    /// Period expressed in days (fractional days allowed).
    pub period_days: f64,
    /// Number of Fourier harmonics; two basis columns per harmonic.
    pub fourier_order: usize,
    pub mode: TermMode,
    pub prior_scale: f64,
}

impl Season {
    pub fn new(name: impl Into<String>, period_days: f64, fourier_order: usize) -> Self {
        Self {
            name: name.into(),
            period_days,
            fourier_order,
            mode: TermMode::Additive,
            prior_scale: 10.0,
        }
    }

    pub fn yearly() -> Self {
        Self::new("yearly", 365.25, 10)
    }

    pub fn weekly() -> Self {
        Self::new("weekly", 7.0, 3)
    }

    pub fn daily() -> Self {
        Self::new("daily", 1.0, 4)
    }

    pub fn with_mode(mut self, mode: TermMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_prior_scale(mut self, scale: f64) -> Self {
        self.prior_scale = scale;
        self
    }

    fn validate(&self) -> Result<(), SpecificationError> {
        if self.period_days <= 0.0 {
            return Err(SpecificationError::InvalidParameter {
                param: "period".into(),
                value: format!("{}", self.period_days),
                reason: "must be a positive number of days".into(),
            });
        }
        if self.fourier_order < 1 {
            return Err(SpecificationError::InvalidParameter {
                param: "fourier_order".into(),
                value: format!("{}", self.fourier_order),
                reason: "must be at least 1".into(),
            });
        }
        if self.prior_scale <= 0.0 {
            return Err(SpecificationError::InvalidParameter {
                param: "prior_scale".into(),
                value: format!("{}", self.prior_scale),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Holiday term: effect active within a day-offset window around given dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Holiday {
    pub name: String,
    pub dates: Vec<NaiveDate>,
    /// Day offsets around each date: (lower, upper), inclusive.
    pub window: (i32, i32),
    pub prior_scale: f64,
}

impl Holiday {
    pub fn new(name: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            dates,
            window: (0, 0),
            prior_scale: 10.0,
        }
    }

    pub fn with_window(mut self, lower: i32, upper: i32) -> Self {
        self.window = (lower, upper);
        self
    }

    pub fn with_prior_scale(mut self, scale: f64) -> Self {
        self.prior_scale = scale;
        self
    }

    fn validate(&self) -> Result<(), SpecificationError> {
        if self.window.0 > self.window.1 {
            return Err(SpecificationError::InvalidParameter {
                param: "window".into(),
                value: format!("({}, {})", self.window.0, self.window.1),
                reason: "lower offset must not exceed upper offset".into(),
            });
        }
        if self.prior_scale <= 0.0 {
            return Err(SpecificationError::InvalidParameter {
                param: "prior_scale".into(),
                value: format!("{}", self.prior_scale),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Exogenous regressor term: a table column used as a linear covariate.
#[derive(Debug, Clone, PartialEq)]
pub struct Regressor {
    pub column: String,
    pub mode: TermMode,
    pub prior_scale: f64,
}

impl Regressor {
    pub fn additive(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mode: TermMode::Additive,
            prior_scale: 10.0,
        }
    }

    pub fn multiplicative(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            mode: TermMode::Multiplicative,
            prior_scale: 10.0,
        }
    }

    pub fn with_prior_scale(mut self, scale: f64) -> Self {
        self.prior_scale = scale;
        self
    }

    fn validate(&self) -> Result<(), SpecificationError> {
        if self.prior_scale <= 0.0 {
            return Err(SpecificationError::InvalidParameter {
                param: "prior_scale".into(),
                value: format!("{}", self.prior_scale),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// One term of a specification; closed variant set.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Growth(Growth),
    Season(Season),
    Holiday(Holiday),
    Regressor(Regressor),
}

// Automatic-mode inclusion thresholds (in the sampled time unit).
// A season is included only when the observed span covers at least two of
// its cycles and the sampling interval resolves it.
const AUTO_YEARLY_MIN_SPAN_DAYS: f64 = 730.0;
const AUTO_WEEKLY_MIN_SPAN_DAYS: f64 = 14.0;
const AUTO_DAILY_MIN_SPAN_DAYS: f64 = 2.0;

/// Declarative model specification for one response column.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    response: String,
    growths: Vec<Growth>,
    seasons: Vec<Season>,
    holidays: Vec<Holiday>,
    regressors: Vec<Regressor>,
    auto_seasonality: bool,
}

impl ModelSpec {
    /// Explicit specification: terms are added through the builder methods.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            growths: Vec::new(),
            seasons: Vec::new(),
            holidays: Vec::new(),
            regressors: Vec::new(),
            auto_seasonality: false,
        }
    }

    /// Automatic term selection: linear growth with default changepoint
    /// settings plus yearly/weekly/daily seasons gated per series by its span
    /// and sampling interval at fit time.
    pub fn auto(response: impl Into<String>) -> Self {
        Self {
            auto_seasonality: true,
            ..Self::new(response)
        }
    }

    pub fn growth(mut self, growth: Growth) -> Self {
        self.growths.push(growth);
        self
    }

    pub fn season(mut self, season: Season) -> Self {
        self.seasons.push(season);
        self
    }

    pub fn holiday(mut self, holiday: Holiday) -> Self {
        self.holidays.push(holiday);
        self
    }

    pub fn regressor(mut self, regressor: Regressor) -> Self {
        self.regressors.push(regressor);
        self
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn is_auto(&self) -> bool {
        self.auto_seasonality
    }

    pub fn seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    pub fn regressors(&self) -> &[Regressor] {
        &self.regressors
    }

    /// The growth term, defaulting to linear growth when none was given.
    pub fn growth_term(&self) -> Growth {
        self.growths.first().cloned().unwrap_or_default()
    }

    /// Validate the specification against the table's column schema.
    ///
    /// Raised errors indicate a caller mistake applying to every key, so
    /// callers abort the whole batch.
    pub fn validate(&self, schema: &[&str]) -> Result<(), SpecificationError> {
        if self.growths.len() > 1 {
            return Err(SpecificationError::DuplicateGrowth);
        }
        if !schema.contains(&self.response.as_str()) {
            return Err(SpecificationError::UnknownColumn(self.response.clone()));
        }

        let mut names: std::collections::HashSet<&str> = std::collections::HashSet::new();
        for season in &self.seasons {
            season.validate()?;
            if !names.insert(season.name.as_str()) {
                return Err(SpecificationError::DuplicateTerm(season.name.clone()));
            }
        }
        for holiday in &self.holidays {
            holiday.validate()?;
            if !names.insert(holiday.name.as_str()) {
                return Err(SpecificationError::DuplicateTerm(holiday.name.clone()));
            }
        }
        for regressor in &self.regressors {
            regressor.validate()?;
            if !names.insert(regressor.column.as_str()) {
                return Err(SpecificationError::DuplicateTerm(regressor.column.clone()));
            }
            if !schema.contains(&regressor.column.as_str()) {
                return Err(SpecificationError::UnknownColumn(regressor.column.clone()));
            }
        }
        if let Some(growth) = self.growths.first() {
            growth.validate()?;
        }
        Ok(())
    }

    /// The ordered term list: growth first, then seasons, holidays,
    /// regressors in declaration order.
    pub fn terms(&self) -> Vec<Term> {
        let mut terms = vec![Term::Growth(self.growth_term())];
        terms.extend(self.seasons.iter().cloned().map(Term::Season));
        terms.extend(self.holidays.iter().cloned().map(Term::Holiday));
        terms.extend(self.regressors.iter().cloned().map(Term::Regressor));
        terms
    }

    /// Rebuild a specification from a term list.
    pub fn from_terms(
        response: impl Into<String>,
        terms: Vec<Term>,
    ) -> Result<Self, SpecificationError> {
        let mut spec = Self::new(response);
        for term in terms {
            spec = match term {
                Term::Growth(g) => spec.growth(g),
                Term::Season(s) => spec.season(s),
                Term::Holiday(h) => spec.holiday(h),
                Term::Regressor(r) => spec.regressor(r),
            };
        }
        if spec.growths.len() > 1 {
            return Err(SpecificationError::DuplicateGrowth);
        }
        Ok(spec)
    }

    /// Resolve the specification for one series, synthesizing automatic
    /// season terms from the series' span and sampling interval.
    pub fn resolve(&self, span_micros: i64, interval_micros: i64) -> ModelSpec {
        if !self.auto_seasonality {
            let mut resolved = self.clone();
            if resolved.growths.is_empty() {
                resolved.growths.push(Growth::default());
            }
            return resolved;
        }

        let span_days = span_micros as f64 / MICROS_PER_DAY as f64;
        let interval_days = interval_micros as f64 / MICROS_PER_DAY as f64;

        let mut resolved = ModelSpec::new(self.response.clone());
        resolved.growths.push(self.growth_term());
        if span_days >= AUTO_YEARLY_MIN_SPAN_DAYS {
            resolved.seasons.push(Season::yearly());
        }
        if span_days >= AUTO_WEEKLY_MIN_SPAN_DAYS && interval_days < 7.0 {
            resolved.seasons.push(Season::weekly());
        }
        if span_days >= AUTO_DAILY_MIN_SPAN_DAYS && interval_days < 1.0 {
            resolved.seasons.push(Season::daily());
        }
        resolved.holidays = self.holidays.clone();
        resolved.regressors = self.regressors.clone();
        resolved
    }
}
