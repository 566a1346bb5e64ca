//! Exponential decline curve
//!
//! q(t) = q0·exp(−D·t), t in years, q per day. Cumulative is the analytic
//! integral of the same rate, so rate and cumulative never disagree:
//!
//! Q(t) = q0·days_per_year·(1 − exp(−D·t)) / D,   Q(t) = q0·days_per_year·t when D = 0

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclineCurve {
    initial_rate: f64,
    annual_decline: f64,
    days_per_year: f64,
}

impl DeclineCurve {
    pub fn new(initial_rate: f64, annual_decline: f64, days_per_year: f64) -> Self {
        Self {
            initial_rate,
            annual_decline,
            days_per_year,
        }
    }

    /// Daily rate after `t` years
    pub fn rate(&self, t: f64) -> f64 {
        self.initial_rate * (-self.annual_decline * t).exp()
    }

    /// Volume produced over the first `t` years
    pub fn cumulative(&self, t: f64) -> f64 {
        let annual_volume = self.initial_rate * self.days_per_year;
        if self.annual_decline == 0.0 {
            annual_volume * t
        } else {
            // exp_m1 keeps precision for small D·t
            -annual_volume * (-self.annual_decline * t).exp_m1() / self.annual_decline
        }
    }
}
