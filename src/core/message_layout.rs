use crate::core::steps;
use crate::types::errors::LayoutError;
use crate::types::signal::{MuxSelector, Signal};

/// Verify that a compiled signal fits within a frame of `dlc` bytes.
/// Returns Ok(()) if the signal fits; Err(...) with the reason otherwise.
///
/// Both conventions are checked the same way: the compiled steps name every byte
/// the field touches, so the field fits iff its highest byte is below `dlc`.
pub fn check_signal_fits(dlc: u16, signal: &Signal) -> Result<(), LayoutError> {
    if signal.length == 0 {
        return Err(LayoutError::ZeroBitLength {
            signal: signal.name.clone(),
        });
    }
    let last_byte: usize = match steps::last_byte(&signal.steps) {
        Some(b) => b,
        None => signal.last_byte(),
    };
    if last_byte < dlc as usize {
        Ok(())
    } else {
        Err(LayoutError::OutOfBounds {
            signal: signal.name.clone(),
            last_byte,
            dlc,
        })
    }
}

/// One link of a multiplex constraint chain: `signals[selector]` must hold one of `ids`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MuxLink {
    pub(crate) selector: usize,
    pub(crate) ids: Vec<MuxSelector>,
}

/// Two constraint chains are mutually exclusive when they share a selector whose
/// accepted id sets cannot hold at the same time.
pub(crate) fn chains_exclusive(a: &[MuxLink], b: &[MuxLink]) -> bool {
    a.iter().any(|la| {
        b.iter().any(|lb| {
            la.selector == lb.selector
                && la
                    .ids
                    .iter()
                    .all(|x| lb.ids.iter().all(|y| x.disjoint(y)))
        })
    })
}

/// Finds the first pair of signals that share payload bits while being active together.
///
/// `chains[i]` is the full constraint chain of `signals[i]`.
pub(crate) fn find_active_overlap(
    dlc: usize,
    signals: &[Signal],
    chains: &[Vec<MuxLink>],
) -> Option<(usize, usize)> {
    let masks: Vec<Vec<u8>> = signals.iter().map(|s| s.byte_masks(dlc)).collect();

    for i in 0..signals.len() {
        for j in (i + 1)..signals.len() {
            let overlap = masks[i]
                .iter()
                .zip(masks[j].iter())
                .any(|(a, b)| a & b != 0);
            if overlap && !chains_exclusive(&chains[i], &chains[j]) {
                return Some((i, j));
            }
        }
    }
    None
}
