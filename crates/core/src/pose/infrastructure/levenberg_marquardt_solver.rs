//! Iterative Perspective-n-Point solver.
//!
//! A closed-form scaled-orthographic fit gives the starting pose; Levenberg–
//! Marquardt then minimises the squared pixel reprojection error over the
//! 6-vector `(rotation vector, translation)`. The Jacobian is taken by central
//! differences, which keeps the distortion model out of the derivative code.

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Point3, Rotation3, Vector3, Vector6};

use crate::pose::domain::pose_estimate::PoseSolution;
use crate::pose::domain::pose_solver::{PoseSolver, SolverError};
use crate::shared::camera_intrinsics::CameraIntrinsics;
use crate::shared::config::DEFAULT_MAX_SOLVER_ITERATIONS;

const MIN_CORRESPONDENCES: usize = 4;
const MIN_DEPTH: f64 = 1e-9;
const INITIAL_LAMBDA: f64 = 1e-3;
const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e10;
const DIAGONAL_FLOOR: f64 = 1e-9;
const STEP_TOLERANCE: f64 = 1e-10;
const COST_TOLERANCE: f64 = 1e-14;
/// Squared-pixel cost treated as an exact fit.
const EXACT_FIT_COST: f64 = 1e-18;
const DIFF_STEP: f64 = 1e-6;

pub struct LevenbergMarquardtSolver {
    max_iterations: usize,
}

impl LevenbergMarquardtSolver {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

impl Default for LevenbergMarquardtSolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOLVER_ITERATIONS)
    }
}

impl PoseSolver for LevenbergMarquardtSolver {
    fn solve(
        &self,
        object: &[Point3<f64>],
        image: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<PoseSolution, SolverError> {
        if object.len() != image.len() {
            return Err(SolverError::CorrespondenceMismatch {
                object: object.len(),
                image: image.len(),
            });
        }
        if object.len() < MIN_CORRESPONDENCES {
            return Err(SolverError::TooFewPoints(object.len()));
        }
        let inputs_finite = object.iter().all(|p| p.coords.iter().all(|v| v.is_finite()))
            && image.iter().all(|p| p.coords.iter().all(|v| v.is_finite()));
        if !inputs_finite {
            return Err(SolverError::NonFinite);
        }

        let problem = Problem {
            object,
            image,
            intrinsics,
        };
        let initial = problem.initial_guess()?;
        problem.refine(initial, self.max_iterations)
    }
}

struct Problem<'a> {
    object: &'a [Point3<f64>],
    image: &'a [Point2<f64>],
    intrinsics: &'a CameraIntrinsics,
}

impl Problem<'_> {
    /// Scaled-orthographic pose: every point is assumed to sit at the depth
    /// of the model centroid, which makes the fit linear.
    fn initial_guess(&self) -> Result<Vector6<f64>, SolverError> {
        let n = self.object.len() as f64;
        let centroid = self
            .object
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / n;
        let normalized: Vec<(f64, f64)> = self
            .image
            .iter()
            .map(|p| self.intrinsics.normalize_pixel(p))
            .collect();
        let mean_x = normalized.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = normalized.iter().map(|p| p.1).sum::<f64>() / n;

        let centered = DMatrix::from_fn(self.object.len(), 3, |i, j| {
            self.object[i].coords[j] - centroid[j]
        });
        let pinv = centered
            .pseudo_inverse(1e-12)
            .map_err(|_| SolverError::Degenerate)?;
        let bx = DVector::from_iterator(normalized.len(), normalized.iter().map(|p| p.0 - mean_x));
        let by = DVector::from_iterator(normalized.len(), normalized.iter().map(|p| p.1 - mean_y));
        let sr1 = &pinv * bx;
        let sr2 = &pinv * by;

        let (n1, n2) = (sr1.norm(), sr2.norm());
        if n1 < f64::EPSILON || n2 < f64::EPSILON {
            return Err(SolverError::Degenerate);
        }
        let r1 = Vector3::new(sr1[0], sr1[1], sr1[2]) / n1;
        let r2 = Vector3::new(sr2[0], sr2[1], sr2[2]) / n2;
        let r3 = r1.cross(&r2);
        if r3.norm() < 1e-6 {
            return Err(SolverError::Degenerate);
        }
        let rows = Matrix3::from_rows(&[r1.transpose(), r2.transpose(), r3.normalize().transpose()]);
        let rotation = Rotation3::from_matrix(&rows);

        let scale = (n1 + n2) / 2.0;
        let tz = 1.0 / scale;
        let centroid_camera = Vector3::new(mean_x * tz, mean_y * tz, tz);
        let translation = centroid_camera - rotation * centroid;

        let mut params = Vector6::zeros();
        params.fixed_rows_mut::<3>(0).copy_from(&rotation.scaled_axis());
        params.fixed_rows_mut::<3>(3).copy_from(&translation);
        if params.iter().any(|v| !v.is_finite()) {
            return Err(SolverError::NonFinite);
        }
        Ok(params)
    }

    fn refine(
        &self,
        mut params: Vector6<f64>,
        max_iterations: usize,
    ) -> Result<PoseSolution, SolverError> {
        let mut residual = self.residuals(&params)?;
        let mut cost = residual.norm_squared();
        let (mut jtj, mut gradient) = self.normal_equations(&params, &residual)?;
        let mut lambda = INITIAL_LAMBDA;

        for iteration in 0..max_iterations {
            if cost <= EXACT_FIT_COST {
                return self.finish(&params, cost);
            }

            let mut damped = jtj.clone();
            for k in 0..6 {
                damped[(k, k)] += lambda * jtj[(k, k)].max(DIAGONAL_FLOOR);
            }

            let accepted = damped.cholesky().and_then(|chol| {
                let delta = Vector6::from_column_slice(chol.solve(&(-&gradient)).as_slice());
                let candidate = params + delta;
                let candidate_residual = self.residuals(&candidate).ok()?;
                let candidate_cost = candidate_residual.norm_squared();
                (candidate_cost < cost).then_some((delta, candidate, candidate_residual, candidate_cost))
            });

            match accepted {
                Some((delta, candidate, candidate_residual, candidate_cost)) => {
                    let small_step =
                        delta.norm() <= STEP_TOLERANCE * (params.norm() + STEP_TOLERANCE);
                    let small_gain = cost - candidate_cost <= COST_TOLERANCE * cost;

                    params = candidate;
                    residual = candidate_residual;
                    cost = candidate_cost;
                    lambda = (lambda / 10.0).max(MIN_LAMBDA);

                    if small_step || small_gain {
                        log::trace!("LM converged after {} iterations", iteration + 1);
                        return self.finish(&params, cost);
                    }
                    (jtj, gradient) = self.normal_equations(&params, &residual)?;
                }
                None => {
                    lambda *= 10.0;
                    // No descent direction left at any damping: stationary point.
                    if lambda > MAX_LAMBDA {
                        return self.finish(&params, cost);
                    }
                }
            }
        }

        Err(SolverError::NotConverged {
            iterations: max_iterations,
        })
    }

    fn finish(&self, params: &Vector6<f64>, cost: f64) -> Result<PoseSolution, SolverError> {
        if params.iter().any(|v| !v.is_finite()) || !cost.is_finite() {
            return Err(SolverError::NonFinite);
        }
        let (rotation, translation) = split(params);
        Ok(PoseSolution {
            rotation: rotation.scaled_axis(),
            translation,
            reprojection_error: (cost / self.object.len() as f64).sqrt(),
        })
    }

    /// Pixel residuals `projected - observed`, two per point.
    fn residuals(&self, params: &Vector6<f64>) -> Result<DVector<f64>, SolverError> {
        let (rotation, translation) = split(params);
        let mut out = DVector::zeros(2 * self.object.len());
        for (index, (p, observed)) in self.object.iter().zip(self.image).enumerate() {
            let camera = rotation * p.coords + translation;
            if camera.z <= MIN_DEPTH {
                return Err(SolverError::BehindCamera { index });
            }
            let projected = self.intrinsics.project_camera_point(&camera);
            out[2 * index] = projected.x - observed.x;
            out[2 * index + 1] = projected.y - observed.y;
        }
        Ok(out)
    }

    fn normal_equations(
        &self,
        params: &Vector6<f64>,
        residual: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, DVector<f64>), SolverError> {
        let mut jacobian = DMatrix::zeros(residual.len(), 6);
        for k in 0..6 {
            let h = DIFF_STEP * params[k].abs().max(1.0);
            let mut plus = *params;
            let mut minus = *params;
            plus[k] += h;
            minus[k] -= h;
            let column = (self.residuals(&plus)? - self.residuals(&minus)?) / (2.0 * h);
            jacobian.set_column(k, &column);
        }
        Ok((jacobian.tr_mul(&jacobian), jacobian.tr_mul(residual)))
    }
}

fn split(params: &Vector6<f64>) -> (Rotation3<f64>, Vector3<f64>) {
    let rvec: Vector3<f64> = params.fixed_rows::<3>(0).into_owned();
    let tvec: Vector3<f64> = params.fixed_rows::<3>(3).into_owned();
    (Rotation3::from_scaled_axis(rvec), tvec)
}
