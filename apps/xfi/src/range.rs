//! Line-length-aware range validation.
//!
//! Coordinates are 0-based and end-exclusive. Only zero-width requests are
//! ever changed; real spans pass through after clamping negatives.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeOptions {
    /// Keep zero-width carets that sit inside the line.
    pub preserve_zero_width: bool,
    /// Expansion used when the line text is known.
    pub max_expansion: u32,
    /// Expansion used when no line text is available.
    pub fallback_expansion: u32,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            preserve_zero_width: true,
            max_expansion: 1,
            fallback_expansion: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RangeReason {
    PreservedZeroWidthValidPosition,
    ExpandedWithinLineBounds,
    AdjustedStartBeyondLineEnd,
    LineBeyondDocumentFallback,
    FallbackExpansionNoDocument,
    NoAdjustmentNeeded,
}

impl RangeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeReason::PreservedZeroWidthValidPosition => "preserved-zero-width-valid-position",
            RangeReason::ExpandedWithinLineBounds => "expanded-within-line-bounds",
            RangeReason::AdjustedStartBeyondLineEnd => "adjusted-start-beyond-line-end",
            RangeReason::LineBeyondDocumentFallback => "line-beyond-document-fallback",
            RangeReason::FallbackExpansionNoDocument => "fallback-expansion-no-document",
            RangeReason::NoAdjustmentNeeded => "no-adjustment-needed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub was_adjusted: bool,
    pub reason: RangeReason,
}

fn clamp(v: i64) -> u32 {
    v.clamp(0, u32::MAX as i64) as u32
}

/// Produce a safe range from raw coordinates.
///
/// `source` is the full text of the file when the caller has it; without it
/// the fallback expansion applies and nothing is read from disk.
pub fn validate_range(
    start_line: i64,
    start_column: i64,
    end_line: i64,
    end_column: i64,
    source: Option<&str>,
    opts: &RangeOptions,
) -> ValidatedRange {
    let sl = clamp(start_line);
    let sc = clamp(start_column);
    let (mut el, mut ec) = (clamp(end_line), clamp(end_column));
    if (el, ec) < (sl, sc) {
        el = sl;
        ec = sc;
    }

    let out = |start_column: u32, end_column: u32, was_adjusted: bool, reason: RangeReason| {
        ValidatedRange {
            start_line: sl,
            start_column,
            end_line: sl,
            end_column,
            was_adjusted,
            reason,
        }
    };

    if (el, ec) != (sl, sc) {
        return ValidatedRange {
            start_line: sl,
            start_column: sc,
            end_line: el,
            end_column: ec,
            was_adjusted: false,
            reason: RangeReason::NoAdjustmentNeeded,
        };
    }

    let fallback = opts.fallback_expansion.max(1);
    let Some(text) = source else {
        return out(
            sc,
            sc.saturating_add(fallback),
            true,
            RangeReason::FallbackExpansionNoDocument,
        );
    };

    let Some(line) = text.lines().nth(sl as usize) else {
        return out(
            sc,
            sc.saturating_add(fallback),
            true,
            RangeReason::LineBeyondDocumentFallback,
        );
    };
    let len = line.chars().count().min(u32::MAX as usize) as u32;

    if sc < len {
        if opts.preserve_zero_width {
            return out(sc, sc, false, RangeReason::PreservedZeroWidthValidPosition);
        }
        let mut end = sc.saturating_add(opts.max_expansion.max(1)).min(len);
        if end <= sc {
            end = sc + 1;
        }
        return out(sc, end, true, RangeReason::ExpandedWithinLineBounds);
    }

    // At or past the end of the line: cover the last character instead.
    let start = len.saturating_sub(1);
    out(start, len, true, RangeReason::AdjustedStartBeyondLineEnd)
}
