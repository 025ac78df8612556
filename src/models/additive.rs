// src/models/additive.rs

use std::f64::consts::PI;

use chrono::{Duration, NaiveDate};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1, Normal, Poisson};

use crate::error::{AppError, Result};
use crate::models::{ForecastRow, PriceObservation};
use crate::utils::linalg::{quantile_sorted, solve_symmetric};

/// Largest number of days the dashboard will project.
pub const MAX_HORIZON: usize = 30;

const YEARLY_PERIOD: f64 = 365.25;
const WEEKLY_PERIOD: f64 = 7.0;

/// Fit a model on a series, then extrapolate it.
pub trait Forecaster {
    type Model;

    fn fit(&self, series: &[PriceObservation]) -> Result<Self::Model>;

    fn predict(&self, model: &Self::Model, horizon: usize) -> Result<Vec<ForecastRow>>;
}

/// Tuning knobs of the additive model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Potential trend changepoints placed over the early history.
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may sit.
    pub changepoint_range: f64,
    /// Prior scale of the changepoint deltas; small values give a stiffer trend.
    pub changepoint_prior_scale: f64,
    /// Prior scale of the Fourier coefficients.
    pub seasonality_prior_scale: f64,
    pub yearly_order: usize,
    pub weekly_order: usize,
    /// Probability mass between the lower and upper bound.
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_order: 10,
            weekly_order: 3,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seasonality {
    period: f64,
    order: usize,
}

impl Seasonality {
    fn width(&self) -> usize {
        2 * self.order
    }

    fn push_features(&self, epoch_day: f64, out: &mut Vec<f64>) {
        for k in 1..=self.order {
            let x = 2.0 * PI * k as f64 * epoch_day / self.period;
            out.push(x.sin());
            out.push(x.cos());
        }
    }
}

/// Piecewise-linear trend plus Fourier seasonality, fitted on one dataset.
#[derive(Debug, Clone)]
pub struct FittedModel {
    start: NaiveDate,
    last: NaiveDate,
    span_days: f64,
    y_scale: f64,
    offset: f64,
    growth: f64,
    changepoints: Vec<f64>,
    deltas: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    seasonal_coefs: Vec<f64>,
    sigma: f64,
    n_obs: usize,
}

impl FittedModel {
    pub fn last_date(&self) -> NaiveDate {
        self.last
    }

    pub fn observations(&self) -> usize {
        self.n_obs
    }

    /// Standard deviation of the in-sample residuals, in USD.
    pub fn residual_std(&self) -> f64 {
        self.sigma * self.y_scale
    }

    pub fn has_yearly_seasonality(&self) -> bool {
        self.seasonalities.iter().any(|s| s.period == YEARLY_PERIOD)
    }

    pub fn has_weekly_seasonality(&self) -> bool {
        self.seasonalities.iter().any(|s| s.period == WEEKLY_PERIOD)
    }

    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.start).num_days() as f64 / self.span_days
    }

    /// Point estimate in USD.
    pub fn value_at(&self, date: NaiveDate) -> f64 {
        let mut row = Vec::with_capacity(2 + self.deltas.len() + self.seasonal_coefs.len());
        design_row(
            self.scaled_time(date),
            epoch_day(date),
            &self.changepoints,
            &self.seasonalities,
            &mut row,
        );
        let coefs = [self.offset, self.growth]
            .into_iter()
            .chain(self.deltas.iter().copied())
            .chain(self.seasonal_coefs.iter().copied());
        row.iter().zip(coefs).map(|(x, b)| x * b).sum::<f64>() * self.y_scale
    }

    fn laplace_scale(&self) -> f64 {
        if self.deltas.is_empty() {
            return 0.0;
        }
        self.deltas.iter().map(|d| d.abs()).sum::<f64>() / self.deltas.len() as f64 + 1e-8
    }
}

/// Additive time-series model with Monte-Carlo uncertainty intervals.
#[derive(Debug, Clone, Default)]
pub struct AdditiveModel {
    config: ModelConfig,
}

impl AdditiveModel {
    fn seasonalities_for(&self, span_days: f64, min_spacing: f64) -> Vec<Seasonality> {
        let mut seasonalities = Vec::new();
        if span_days >= 2.0 * 365.0 && self.config.yearly_order > 0 {
            seasonalities.push(Seasonality {
                period: YEARLY_PERIOD,
                order: self.config.yearly_order,
            });
        }
        if span_days >= 14.0 && min_spacing < 7.0 && self.config.weekly_order > 0 {
            seasonalities.push(Seasonality {
                period: WEEKLY_PERIOD,
                order: self.config.weekly_order,
            });
        }
        seasonalities
    }

    /// Sampled deviations from the point forecast, one sorted vector per step.
    fn sample_deviations(&self, model: &FittedModel, times: &[f64]) -> Result<Vec<Vec<f64>>> {
        let n_samples = self.config.uncertainty_samples;
        let mut samples = vec![Vec::with_capacity(n_samples); times.len()];
        let Some(&t_end) = times.last() else {
            return Ok(samples);
        };

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let t_last = model.scaled_time(model.last);
        // The history covers one unit of scaled time.
        let expected_changes = model.changepoints.len() as f64 * (t_end - t_last).max(0.0);
        let changes = if expected_changes > 0.0 {
            Some(Poisson::new(expected_changes).map_err(|e| AppError::ModelFit(e.to_string()))?)
        } else {
            None
        };
        let noise = Normal::new(0.0, model.sigma).map_err(|e| AppError::ModelFit(e.to_string()))?;
        let scale = model.laplace_scale();

        for _ in 0..n_samples {
            let count = changes.as_ref().map_or(0, |d| d.sample(&mut rng) as usize);
            let future_changes: Vec<(f64, f64)> = (0..count)
                .map(|_| {
                    let at = t_last + rng.gen::<f64>() * (t_end - t_last);
                    // Laplace draw: exponential magnitude with a random sign.
                    let magnitude: f64 = Exp1.sample(&mut rng);
                    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                    (at, sign * scale * magnitude)
                })
                .collect();

            for (step, &t) in times.iter().enumerate() {
                let trend_shift: f64 = future_changes
                    .iter()
                    .map(|&(at, delta)| delta * (t - at).max(0.0))
                    .sum();
                samples[step].push((trend_shift + noise.sample(&mut rng)) * model.y_scale);
            }
        }

        for step in samples.iter_mut() {
            step.sort_by(|a, b| a.total_cmp(b));
        }
        Ok(samples)
    }
}

impl Forecaster for AdditiveModel {
    type Model = FittedModel;

    fn fit(&self, series: &[PriceObservation]) -> Result<FittedModel> {
        let n = series.len();
        if n < 2 {
            return Err(AppError::InsufficientData { needed: 2, got: n });
        }

        let mut points: Vec<(NaiveDate, f64)> = series.iter().map(|o| (o.date, o.price)).collect();
        points.sort_by_key(|p| p.0);
        let start = points[0].0;
        let last = points[n - 1].0;
        let span_days = (last - start).num_days() as f64;
        if span_days <= 0.0 {
            return Err(AppError::DegenerateSpan);
        }

        let y_scale = match points.iter().map(|p| p.1.abs()).fold(0.0, f64::max) {
            m if m > 0.0 => m,
            _ => 1.0,
        };
        let t: Vec<f64> = points
            .iter()
            .map(|p| (p.0 - start).num_days() as f64 / span_days)
            .collect();
        let y: Vec<f64> = points.iter().map(|p| p.1 / y_scale).collect();
        let days: Vec<f64> = points.iter().map(|p| epoch_day(p.0)).collect();

        let min_spacing = points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).num_days())
            .filter(|d| *d > 0)
            .min()
            .unwrap_or(0) as f64;
        let seasonalities = self.seasonalities_for(span_days, min_spacing);

        let history = ((n as f64) * self.config.changepoint_range).floor() as usize;
        let n_cp = self.config.n_changepoints.min(history.saturating_sub(1));
        let changepoints: Vec<f64> = (1..=n_cp)
            .map(|j| {
                let idx = ((history - 1) as f64 * j as f64 / n_cp as f64).round() as usize;
                t[idx]
            })
            .collect();

        // Residual variance of a plain linear trend sets the strength of the priors.
        let base_var = linear_residual_variance(&t, &y).max(1e-6);
        let delta_penalty = base_var / self.config.changepoint_prior_scale.powi(2);
        let seasonal_penalty = base_var / self.config.seasonality_prior_scale.powi(2);

        let n_seasonal: usize = seasonalities.iter().map(Seasonality::width).sum();
        let p = 2 + n_cp + n_seasonal;
        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        let mut row = Vec::with_capacity(p);
        for i in 0..n {
            row.clear();
            design_row(t[i], days[i], &changepoints, &seasonalities, &mut row);
            for a in 0..p {
                xty[a] += row[a] * y[i];
                for b in 0..=a {
                    xtx[a][b] += row[a] * row[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                xtx[b][a] = xtx[a][b];
            }
            xtx[a][a] += 1e-8;
            if (2..2 + n_cp).contains(&a) {
                xtx[a][a] += delta_penalty;
            } else if a >= 2 + n_cp {
                xtx[a][a] += seasonal_penalty;
            }
        }

        let beta = solve_symmetric(&xtx, &xty)
            .ok_or_else(|| AppError::ModelFit("normal equations are not positive definite".into()))?;

        let mut sse = 0.0;
        for i in 0..n {
            row.clear();
            design_row(t[i], days[i], &changepoints, &seasonalities, &mut row);
            let fitted: f64 = row.iter().zip(&beta).map(|(x, b)| x * b).sum();
            sse += (y[i] - fitted).powi(2);
        }
        let sigma = (sse / n as f64).sqrt();
        if !sigma.is_finite() {
            return Err(AppError::ModelFit("residuals are not finite".into()));
        }

        let model = FittedModel {
            start,
            last,
            span_days,
            y_scale,
            offset: beta[0],
            growth: beta[1],
            changepoints,
            deltas: beta[2..2 + n_cp].to_vec(),
            seasonalities,
            seasonal_coefs: beta[2 + n_cp..].to_vec(),
            sigma,
            n_obs: n,
        };

        info!(
            "Fitted additive model on {} observations ({} to {})",
            n, model.start, model.last
        );
        debug!(
            "growth={:.6} offset={:.6} changepoints={} seasonal_terms={} sigma={:.6}",
            model.growth,
            model.offset,
            model.changepoints.len(),
            model.seasonal_coefs.len(),
            model.sigma
        );

        Ok(model)
    }

    fn predict(&self, model: &FittedModel, horizon: usize) -> Result<Vec<ForecastRow>> {
        if horizon == 0 || horizon > MAX_HORIZON {
            return Err(AppError::InvalidHorizon {
                got: horizon,
                max: MAX_HORIZON,
            });
        }

        let dates: Vec<NaiveDate> = (1..=horizon)
            .map(|h| model.last + Duration::days(h as i64))
            .collect();
        let times: Vec<f64> = dates.iter().map(|d| model.scaled_time(*d)).collect();
        let deviations = self.sample_deviations(model, &times)?;

        let lower_q = (1.0 - self.config.interval_width) / 2.0;
        let upper_q = 1.0 - lower_q;

        let rows = dates
            .iter()
            .zip(&deviations)
            .map(|(&date, devs)| {
                let mean = model.value_at(date);
                let below = quantile_sorted(devs, lower_q).unwrap_or(0.0).min(0.0);
                let above = quantile_sorted(devs, upper_q).unwrap_or(0.0).max(0.0);
                ForecastRow {
                    date,
                    mean,
                    lower: mean + below,
                    upper: mean + above,
                }
            })
            .collect();

        Ok(rows)
    }
}

fn design_row(
    t: f64,
    epoch_day: f64,
    changepoints: &[f64],
    seasonalities: &[Seasonality],
    out: &mut Vec<f64>,
) {
    out.push(1.0);
    out.push(t);
    out.extend(changepoints.iter().map(|s| (t - s).max(0.0)));
    for seasonality in seasonalities {
        seasonality.push_features(epoch_day, out);
    }
}

fn epoch_day(date: NaiveDate) -> f64 {
    (date - NaiveDate::default()).num_days() as f64
}

fn linear_residual_variance(t: &[f64], y: &[f64]) -> f64 {
    let n = t.len() as f64;
    let t_mean = t.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;
    let sxx: f64 = t.iter().map(|x| (x - t_mean).powi(2)).sum();
    let sxy: f64 = t.iter().zip(y).map(|(x, v)| (x - t_mean) * (v - y_mean)).sum();
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = y_mean - slope * t_mean;
    t.iter()
        .zip(y)
        .map(|(x, v)| (v - intercept - slope * x).powi(2))
        .sum::<f64>()
        / n
}
