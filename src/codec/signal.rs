//! Single-signal conversion between raw bit patterns and [`Value`]s.
//!
//! Decoding order for one field:
//! 1. reinterpret the `length`-bit pattern (two's complement for signed, IEEE-754 for float);
//! 2. compare against the configured invalid sentinel;
//! 3. substitute the value-table label for the raw integer, if any;
//! 4. scale (`raw * scale + offset`).
//!
//! Encoding mirrors it and then masks the result to `length` bits.

use crate::codec::options::{DecodeOptions, EncodeOptions};
use crate::types::errors::CodecError;
use crate::types::signal::Signal;
use crate::types::value::Value;

/// Converts the raw, unsigned field content of `signal` into a value.
pub fn decode_raw(signal: &Signal, raw: u64, options: &DecodeOptions) -> Value {
    let raw = raw & field_mask(signal.length);

    if signal.is_float {
        let f = if signal.length == 32 {
            f32::from_bits(raw as u32) as f64
        } else {
            f64::from_bits(raw)
        };
        if !options.scaling {
            return Value::Float(f);
        }
        let physical = scale_float(signal, f);
        if signal.invalid == Some(physical) {
            return Value::Invalid;
        }
        return Value::Float(physical);
    }

    let signed: i128 = if signal.is_signed {
        sign_extend(raw, signal.length) as i128
    } else {
        raw as i128
    };

    if options.scaling
        && let Some(invalid_raw) = signal.invalid.and_then(|inv| physical_to_raw(signal, inv))
        && invalid_raw == signed as f64
    {
        return Value::Invalid;
    }

    if options.decode_choices
        && let Some(choice) = i64::try_from(signed)
            .ok()
            .and_then(|key| signal.choices.get(&key))
    {
        return Value::Named(choice.clone());
    }

    if !options.scaling || signal.is_identity_scaling() {
        return integer_or_float(signed);
    }

    if signal.scale.fract() == 0.0 && signal.offset.fract() == 0.0 {
        // exact integer arithmetic when scale and offset are whole numbers
        let exact = signed
            .checked_mul(signal.scale as i128)
            .and_then(|v| v.checked_add(signal.offset as i128));
        if let Some(v) = exact {
            return integer_or_float(v);
        }
    }
    Value::Float(signed as f64 * signal.scale + signal.offset)
}

/// Converts `value` into the raw field content of `signal`, masked to `length` bits.
pub fn encode_physical(
    signal: &Signal,
    value: &Value,
    options: &EncodeOptions,
) -> Result<u64, CodecError> {
    match value {
        Value::Named(choice) => {
            let entry =
                signal
                    .choice_by_label(&choice.label)
                    .ok_or_else(|| CodecError::UnknownChoice {
                        signal: signal.name.clone(),
                        label: choice.label.clone(),
                    })?;
            let raw = check_raw_limits(signal, entry.raw as f64, entry.raw as f64, options)?;
            Ok(pack(signal, raw))
        }
        Value::Invalid => {
            let invalid = signal.invalid.ok_or_else(|| CodecError::InvalidNotDefined {
                signal: signal.name.clone(),
            })?;
            encode_number(signal, invalid, options, false)
        }
        Value::Integer(_) | Value::Unsigned(_)
            if !signal.is_float && (!options.scaling || signal.is_identity_scaling()) =>
        {
            // raw integers go through unscaled so 64-bit values keep their precision
            let mut v = value.as_i128().unwrap_or_default();
            if options.scaling {
                let bounded = check_physical_bounds(signal, v as f64, options)?;
                if bounded != v as f64 {
                    v = bounded.round() as i128;
                }
            }
            let (lo, hi) = signal.raw_limits();
            if v < lo || v > hi {
                let raw = check_raw_limits(signal, v as f64, v as f64, options)?;
                return Ok(pack(signal, raw));
            }
            Ok(pack(signal, v))
        }
        Value::Integer(v) => encode_number(signal, *v as f64, options, true),
        Value::Unsigned(v) => encode_number(signal, *v as f64, options, true),
        Value::Float(v) => encode_number(signal, *v, options, true),
    }
}

fn encode_number(
    signal: &Signal,
    value: f64,
    options: &EncodeOptions,
    check_bounds: bool,
) -> Result<u64, CodecError> {
    let physical = if check_bounds && options.scaling {
        check_physical_bounds(signal, value, options)?
    } else {
        value
    };

    if signal.is_float {
        let raw = if options.scaling && !signal.is_identity_scaling() {
            (physical - signal.offset) / signal.scale
        } else {
            physical
        };
        return Ok(if signal.length == 32 {
            (raw as f32).to_bits() as u64
        } else {
            raw.to_bits()
        });
    }

    let raw = if options.scaling {
        physical_to_raw(signal, physical)
    } else if physical.is_finite() {
        Some(physical.round())
    } else {
        None
    };
    let raw = match raw {
        Some(r) => r,
        None => {
            let (minimum, maximum) = physical_limits(signal);
            return Err(CodecError::OutOfRange {
                signal: signal.name.clone(),
                value,
                minimum,
                maximum,
            });
        }
    };
    let raw = check_raw_limits(signal, raw, value, options)?;
    Ok(pack(signal, raw))
}

/// Physical [minimum, maximum] check; clamps in lenient mode.
fn check_physical_bounds(
    signal: &Signal,
    value: f64,
    options: &EncodeOptions,
) -> Result<f64, CodecError> {
    let below = signal.minimum.is_some_and(|min| value < min);
    let above = signal.maximum.is_some_and(|max| value > max);
    if !below && !above {
        return Ok(value);
    }
    if options.strict {
        return Err(CodecError::OutOfRange {
            signal: signal.name.clone(),
            value,
            minimum: signal.minimum.unwrap_or(f64::NEG_INFINITY),
            maximum: signal.maximum.unwrap_or(f64::INFINITY),
        });
    }
    let clamped = match (below, signal.minimum, signal.maximum) {
        (true, Some(min), _) => min,
        (_, _, Some(max)) => max,
        _ => value,
    };
    tracing::debug!(
        "Signal '{}': clamped {} to {}",
        signal.name,
        value,
        clamped
    );
    Ok(clamped)
}

/// Representable raw range check; clamps in lenient mode.
fn check_raw_limits(
    signal: &Signal,
    raw: f64,
    value: f64,
    options: &EncodeOptions,
) -> Result<i128, CodecError> {
    let (lo, hi) = signal.raw_limits();
    if raw >= lo as f64 && raw <= hi as f64 {
        return Ok((raw as i128).clamp(lo, hi));
    }
    if options.strict {
        let (minimum, maximum) = physical_limits(signal);
        return Err(CodecError::OutOfRange {
            signal: signal.name.clone(),
            value,
            minimum,
            maximum,
        });
    }
    let clamped = (raw.clamp(lo as f64, hi as f64) as i128).clamp(lo, hi);
    tracing::debug!(
        "Signal '{}': raw value {} does not fit {} bits, clamped to {}",
        signal.name,
        raw,
        signal.length,
        clamped
    );
    Ok(clamped)
}

/// Physical range covered by the signal's raw range.
fn physical_limits(signal: &Signal) -> (f64, f64) {
    let (lo, hi) = signal.raw_limits();
    let a = lo as f64 * signal.scale + signal.offset;
    let b = hi as f64 * signal.scale + signal.offset;
    if a <= b { (a, b) } else { (b, a) }
}

/// Inverse scaling, rounded to the nearest raw integer. `None` if not finite.
fn physical_to_raw(signal: &Signal, physical: f64) -> Option<f64> {
    let raw = ((physical - signal.offset) / signal.scale).round();
    raw.is_finite().then_some(raw)
}

fn scale_float(signal: &Signal, raw: f64) -> f64 {
    if signal.is_identity_scaling() {
        raw
    } else {
        raw * signal.scale + signal.offset
    }
}

fn integer_or_float(v: i128) -> Value {
    if let Ok(i) = i64::try_from(v) {
        Value::Integer(i)
    } else if let Ok(u) = u64::try_from(v) {
        Value::Unsigned(u)
    } else {
        Value::Float(v as f64)
    }
}

/// Two's-complement packing into `length` bits.
fn pack(signal: &Signal, raw: i128) -> u64 {
    (raw as u64) & field_mask(signal.length)
}

#[inline]
fn field_mask(length: u16) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

/// Reinterprets the low `length` bits of `raw` as a two's-complement number.
#[inline]
pub(crate) fn sign_extend(raw: u64, length: u16) -> i64 {
    if length == 0 || length >= 64 {
        return raw as i64;
    }
    let shift = 64 - length as u32;
    ((raw << shift) as i64) >> shift
}
