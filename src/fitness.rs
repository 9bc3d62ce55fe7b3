use crate::model::Protein;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("ligand radii sum to zero")]
    ZeroRadiusSum,
    #[error("fitness is not finite (radius sum: {0})")]
    NonFinite(f64),
}

/// Fitness of a protein: the inverse of the total ligand radius.
///
/// Higher is better, so compact ligand arrangements are favoured.
pub fn evaluate(protein: &Protein) -> Result<f64, EvalError> {
    let radius_sum: f64 = protein.ligands().iter().map(|ligand| ligand.radius).sum();
    if radius_sum == 0.0 {
        return Err(EvalError::ZeroRadiusSum);
    }
    let fitness = 1.0 / radius_sum;
    if !fitness.is_finite() {
        return Err(EvalError::NonFinite(radius_sum));
    }
    Ok(fitness)
}
