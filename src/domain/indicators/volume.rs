use super::require_len;
use crate::domain::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeOutput {
    pub current: f64,
    pub sma: f64,
    /// Relative volume: `current / sma`.
    pub rvol: f64,
}

pub fn volume_profile(volumes: &[f64], period: usize) -> Result<VolumeOutput, EngineError> {
    require_len(volumes.len(), period)?;
    let window = &volumes[volumes.len() - period..];
    let sma = window.iter().sum::<f64>() / period as f64;
    let current = *volumes.last().expect("non-empty");
    let rvol = if sma > f64::EPSILON { current / sma } else { 0.0 };
    Ok(VolumeOutput { current, sma, rvol })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rvol_above_one_on_volume_spike() {
        let mut volumes = vec![1000.0; 20];
        volumes.push(3000.0);
        let out = volume_profile(&volumes, 20).unwrap();
        assert!(out.rvol > 1.0);
    }

    #[test]
    fn zero_average_never_divides_by_zero() {
        let volumes = vec![0.0; 20];
        let out = volume_profile(&volumes, 20).unwrap();
        assert_eq!(out.rvol, 0.0);
    }
}
