use nalgebra::{DMatrix, DVector};

use super::result::FailureKind;
use super::settings::FitSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Has a measurement with Gaussian uncertainty and contributes to chi2
    Measured,
    /// Free parameter without prior
    Unmeasured,
    /// Kept at its value
    Fixed,
}

/// One fit variable with its start value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub value: f64,
    pub sigma: f64,
    pub kind: VariableKind,
}

impl Variable {
    /// A sigma of exactly 0 makes the variable unmeasured
    pub fn measured(value: f64, sigma: f64) -> Self {
        let kind = if sigma == 0.0 {
            VariableKind::Unmeasured
        } else {
            VariableKind::Measured
        };
        Self { value, sigma, kind }
    }

    pub fn fixed(value: f64) -> Self {
        Self {
            value,
            sigma: 0.0,
            kind: VariableKind::Fixed,
        }
    }

    fn step(&self, current: f64) -> f64 {
        match self.kind {
            VariableKind::Measured => self.sigma * 1.0e-3,
            _ => 1.0e-4 * current.abs().max(1.0),
        }
    }
}

/// Converged fit values
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub values: Vec<f64>,
    pub chi2: f64,
    pub ndf: i64,
    pub iterations: usize,
}

/// Constrained least squares solver with Lagrange multipliers.
///
/// Each iteration linearizes the constraints `f(y, a) = 0` around the current values
/// (numerical central differences) and solves for the corrected measured values `y` and the
/// unmeasured parameters `a`. The solver converges once the largest constraint violation
/// and the change in chi2 are below the accuracies of the [`FitSettings`].
///
/// The engine keeps its Jacobian and scratch buffers between calls, so one engine serves
/// many fits of similar size without reallocation.
#[derive(Debug, Clone, Default)]
pub struct FitEngine {
    settings: FitSettings,
    jacobian: DMatrix<f64>,
    residuals: Vec<f64>,
    plus: Vec<f64>,
    minus: Vec<f64>,
    probe: Vec<f64>,
}

impl FitEngine {
    pub fn new(settings: FitSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Run the fit. `constraints` evaluates all `n_constraints` constraint functions at the
    /// given variable values into the output slice.
    pub fn solve<F>(
        &mut self,
        variables: &[Variable],
        n_constraints: usize,
        mut constraints: F,
    ) -> Result<Solution, FailureKind>
    where
        F: FnMut(&[f64], &mut [f64]),
    {
        let measured: Vec<usize> = indices_of(variables, VariableKind::Measured);
        let unmeasured: Vec<usize> = indices_of(variables, VariableKind::Unmeasured);
        let ndf = n_constraints as i64 - unmeasured.len() as i64;
        if ndf < 1 {
            return Err(FailureKind::Underconstrained);
        }

        let start: Vec<f64> = variables.iter().map(|v| v.value).collect();
        if !all_finite(&start) {
            return Err(FailureKind::NotFinite);
        }
        let variance = DVector::from_iterator(
            measured.len(),
            measured.iter().map(|&j| variables[j].sigma.powi(2)),
        );

        self.prepare(n_constraints, variables.len());
        let mut x = start.clone();
        let mut chi2_before = f64::INFINITY;

        for iteration in 1..=self.settings.max_iterations {
            constraints(&x, &mut self.residuals);
            self.update_jacobian(variables, &x, &mut constraints);
            if !all_finite(&self.residuals) || self.jacobian.iter().any(|v| !v.is_finite()) {
                return Err(FailureKind::NotFinite);
            }

            let b = self.jacobian.select_columns(measured.iter());
            let a = self.jacobian.select_columns(unmeasured.iter());

            let shift = DVector::from_iterator(
                measured.len(),
                measured.iter().map(|&j| start[j] - x[j]),
            );
            let r = DVector::from_column_slice(&self.residuals) + &b * shift;

            let mut bv = b.clone();
            for k in 0..measured.len() {
                bv.column_mut(k).scale_mut(variance[k]);
            }
            let vb = (&bv * b.transpose())
                .try_inverse()
                .ok_or(FailureKind::Singular)?;

            let (corrected, delta_a) = if unmeasured.is_empty() {
                (r, DVector::zeros(0))
            } else {
                let at_vb = a.transpose() * &vb;
                let c_inv = (&at_vb * &a)
                    .try_inverse()
                    .ok_or(FailureKind::Singular)?;
                let delta_a = -(c_inv * (&at_vb * &r));
                (r + &a * &delta_a, delta_a)
            };

            let lambda = &vb * corrected;
            let bt_lambda = b.transpose() * lambda;
            for (k, &j) in measured.iter().enumerate() {
                x[j] = start[j] - variance[k] * bt_lambda[k];
            }
            for (k, &j) in unmeasured.iter().enumerate() {
                x[j] += delta_a[k];
            }

            let chi2: f64 = measured
                .iter()
                .map(|&j| ((start[j] - x[j]) / variables[j].sigma).powi(2))
                .sum();

            constraints(&x, &mut self.residuals);
            if !chi2.is_finite() || !all_finite(&x) || !all_finite(&self.residuals) {
                return Err(FailureKind::NotFinite);
            }

            let violation = self
                .residuals
                .iter()
                .fold(0.0_f64, |max, r| max.max(r.abs()));
            if violation < self.settings.constraint_accuracy
                && (chi2 - chi2_before).abs() < self.settings.chi2_accuracy
            {
                return Ok(Solution {
                    values: x,
                    chi2,
                    ndf,
                    iterations: iteration,
                });
            }
            chi2_before = chi2;
        }

        Err(FailureKind::NotConverged)
    }

    fn prepare(&mut self, n_constraints: usize, n_variables: usize) {
        if self.jacobian.shape() != (n_constraints, n_variables) {
            self.jacobian = DMatrix::zeros(n_constraints, n_variables);
        }
        for buffer in [&mut self.residuals, &mut self.plus, &mut self.minus] {
            buffer.clear();
            buffer.resize(n_constraints, 0.0);
        }
    }

    fn update_jacobian<F>(&mut self, variables: &[Variable], x: &[f64], constraints: &mut F)
    where
        F: FnMut(&[f64], &mut [f64]),
    {
        self.probe.clear();
        self.probe.extend_from_slice(x);
        for (j, variable) in variables.iter().enumerate() {
            if variable.kind == VariableKind::Fixed {
                self.jacobian.column_mut(j).fill(0.0);
                continue;
            }
            let step = variable.step(x[j]);
            self.probe[j] = x[j] + step;
            constraints(&self.probe, &mut self.plus);
            self.probe[j] = x[j] - step;
            constraints(&self.probe, &mut self.minus);
            self.probe[j] = x[j];
            for i in 0..self.plus.len() {
                self.jacobian[(i, j)] = (self.plus[i] - self.minus[i]) / (2.0 * step);
            }
        }
    }
}

fn indices_of(variables: &[Variable], kind: VariableKind) -> Vec<usize> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.kind == kind)
        .map(|(j, _)| j)
        .collect()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}
