use super::require_len;
use crate::domain::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxOutput {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Average Directional Index with genuine directional movement.
///
/// `+DM`/`-DM` come from the actual high/low deltas between consecutive
/// bars, Wilder-smoothed and divided by the Wilder-smoothed true range to
/// produce `+DI`/`-DI`; ADX is the Wilder-smoothed average of the DI
/// spread's absolute percentage. There is no shortcut through a
/// trigonometric proxy for direction — `+DM`/`-DM` are derived from the
/// price series itself.
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Result<AdxOutput, EngineError> {
    require_len(highs.len(), period * 2 + 1)?;
    require_len(lows.len(), period * 2 + 1)?;
    require_len(closes.len(), period * 2 + 1)?;

    let n = highs.len();
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    let mut true_range = Vec::with_capacity(n - 1);

    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];

        let plus = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        plus_dm.push(plus);
        minus_dm.push(minus);

        let hl = highs[i] - lows[i];
        let hc = (highs[i] - closes[i - 1]).abs();
        let lc = (lows[i] - closes[i - 1]).abs();
        true_range.push(hl.max(hc).max(lc));
    }

    let wilder_smooth = |series: &[f64]| -> Vec<f64> {
        let mut smoothed = vec![series[..period].iter().sum::<f64>()];
        for v in &series[period..] {
            let prev = *smoothed.last().expect("seeded above");
            smoothed.push(prev - (prev / period as f64) + v);
        }
        smoothed
    };

    let smoothed_plus_dm = wilder_smooth(&plus_dm);
    let smoothed_minus_dm = wilder_smooth(&minus_dm);
    let smoothed_tr = wilder_smooth(&true_range);

    let dx_series: Vec<f64> = smoothed_plus_dm
        .iter()
        .zip(smoothed_minus_dm.iter())
        .zip(smoothed_tr.iter())
        .map(|((pdm, mdm), tr)| {
            if *tr <= f64::EPSILON {
                return 0.0;
            }
            let plus_di = 100.0 * pdm / tr;
            let minus_di = 100.0 * mdm / tr;
            let di_sum = plus_di + minus_di;
            if di_sum > f64::EPSILON {
                100.0 * (plus_di - minus_di).abs() / di_sum
            } else {
                0.0
            }
        })
        .collect();

    require_len(dx_series.len(), period)?;

    let adx = dx_series[..period].iter().sum::<f64>() / period as f64;
    let mut adx = adx;
    for dx in &dx_series[period..] {
        adx = (adx * (period as f64 - 1.0) + dx) / period as f64;
    }

    let last_tr = *smoothed_tr.last().expect("non-empty");
    let (plus_di, minus_di) = if last_tr > f64::EPSILON {
        (
            100.0 * smoothed_plus_dm.last().expect("non-empty") / last_tr,
            100.0 * smoothed_minus_dm.last().expect("non-empty") / last_tr,
        )
    } else {
        (0.0, 0.0)
    };

    Ok(AdxOutput { adx, plus_di, minus_di })
}

/// ADX >= 40 projects strength 0.8 (very strong trend), >= 25 projects 0.5
/// (established trend); direction follows DI dominance.
pub fn project(output: &AdxOutput) -> super::SignalProjection {
    use super::{Direction, SignalProjection};

    let strength = if output.adx >= 40.0 {
        0.8
    } else if output.adx >= 25.0 {
        0.5
    } else {
        return SignalProjection::neutral();
    };

    let direction = if output.plus_di > output.minus_di {
        Direction::Long
    } else if output.minus_di > output.plus_di {
        Direction::Short
    } else {
        Direction::Neutral
    };

    SignalProjection { direction, strength }
}
