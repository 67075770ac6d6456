//! Statistical primitives shared by the detectors
//!
//! Everything here is a pure function over slices. Tests report p-values
//! from the exact Student's t and F distributions provided by `statrs`.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

/// Magnitude cap for standardized effect sizes.
///
/// Perfectly separated groups have zero pooled variance and an unbounded
/// Cohen's d; reports need a finite, comparable number.
pub const MAX_EFFECT_SIZE: f64 = 10.0;

const EPSILON: f64 = 1e-12;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased sample variance, `None` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Population standard deviation (used for z-scoring).
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / values.len() as f64).sqrt())
}

/// Outcome of comparing two independent samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoSampleTest {
    pub mean_a: f64,
    pub mean_b: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub t_statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: f64,
    /// Cohen's d with pooled standard deviation, capped at [`MAX_EFFECT_SIZE`]
    pub cohens_d: f64,
}

impl TwoSampleTest {
    /// Signed difference of means, `a - b`.
    pub fn mean_difference(&self) -> f64 {
        self.mean_a - self.mean_b
    }
}

/// Welch's unequal-variance t-test of `a` against `b`.
///
/// Requires at least two observations per group. When both groups have zero
/// variance the test is degenerate: equal means give p = 1, different means
/// are perfectly separated and give p = 0.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<TwoSampleTest> {
    let var_a = sample_variance(a)?;
    let var_b = sample_variance(b)?;
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let diff = mean_a - mean_b;

    let se_sq = var_a / n_a + var_b / n_b;
    let (t_statistic, degrees_of_freedom, p_value) = if se_sq <= EPSILON {
        let df = n_a + n_b - 2.0;
        if diff.abs() <= EPSILON {
            (0.0, df, 1.0)
        } else {
            (diff.signum() * f64::INFINITY, df, 0.0)
        }
    } else {
        let t = diff / se_sq.sqrt();
        let numerator = se_sq * se_sq;
        let denominator = (var_a / n_a).powi(2) / (n_a - 1.0) + (var_b / n_b).powi(2) / (n_b - 1.0);
        let df = if denominator <= EPSILON {
            n_a + n_b - 2.0
        } else {
            numerator / denominator
        };
        (t, df, student_t_two_tailed_p(t, df))
    };

    let pooled_var = ((n_a - 1.0) * var_a + (n_b - 1.0) * var_b) / (n_a + n_b - 2.0);
    let cohens_d = standardized_difference(diff, pooled_var.sqrt());

    Some(TwoSampleTest {
        mean_a,
        mean_b,
        n_a: a.len(),
        n_b: b.len(),
        t_statistic,
        degrees_of_freedom,
        p_value,
        cohens_d,
    })
}

fn standardized_difference(diff: f64, sd: f64) -> f64 {
    if diff.abs() <= EPSILON {
        0.0
    } else if sd <= EPSILON {
        diff.signum() * MAX_EFFECT_SIZE
    } else {
        (diff / sd).clamp(-MAX_EFFECT_SIZE, MAX_EFFECT_SIZE)
    }
}

/// Pearson correlation with its two-tailed p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
}

/// Pearson's r between paired samples.
///
/// `None` when lengths differ, fewer than three pairs exist, or either side
/// has zero variance (the coefficient is undefined).
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Correlation> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= EPSILON || var_y <= EPSILON {
        return None;
    }

    let r = (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0);
    let n = x.len() as f64;
    let p_value = if 1.0 - r.abs() <= EPSILON || n <= 2.0 {
        if n > 2.0 {
            0.0
        } else {
            1.0
        }
    } else {
        let t = r * ((n - 2.0) / (1.0 - r * r)).sqrt();
        student_t_two_tailed_p(t, n - 2.0)
    };

    Some(Correlation {
        r,
        p_value,
        n: x.len(),
    })
}

/// One-way ANOVA across groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnovaResult {
    pub f_statistic: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p_value: f64,
    /// Share of variance explained by group membership
    pub eta_squared: f64,
}

/// One-way ANOVA F-test of equal group means.
///
/// Needs at least two non-empty groups and more observations than groups.
/// Returns `None` when every observation is identical.
pub fn one_way_anova(groups: &[Vec<f64>]) -> Option<AnovaResult> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k {
        return None;
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let group_mean = mean(group)?;
        ss_between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }

    let ss_total = ss_between + ss_within;
    if ss_total <= EPSILON {
        return None;
    }

    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let eta_squared = ss_between / ss_total;

    let (f_statistic, p_value) = if ss_within <= EPSILON {
        (f64::INFINITY, 0.0)
    } else {
        let f = (ss_between / df_between) / (ss_within / df_within);
        (f, f_upper_tail_p(f, df_between, df_within))
    };

    Some(AnovaResult {
        f_statistic,
        df_between,
        df_within,
        p_value,
        eta_squared,
    })
}

/// Two-tailed p-value of Student's t with `df` degrees of freedom.
pub fn student_t_two_tailed_p(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return 1.0;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Upper-tail p-value of the F distribution.
pub fn f_upper_tail_p(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() || f <= 0.0 || df1 <= 0.0 || df2 <= 0.0 {
        return 1.0;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
