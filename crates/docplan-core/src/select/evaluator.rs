//! Mask evaluation: deciding, field by field, what a projection selects.

use super::mask::{SelectMask, SelectMode, SelectValue, EMPTY_MASK};

/// Outcome of evaluating a mask for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision<'a> {
    /// The field is selected as a whole.
    Include,
    /// The field is not selected.
    Exclude,
    /// The field is a composite selected through a nested mask.
    Descend(&'a SelectMask),
}

/// Decide whether `name` is selected.
///
/// | mask      | entry    | inclusive | exclusive |
/// |-----------|----------|-----------|-----------|
/// | absent    | any      | Include   | Include   |
/// | present   | `true`   | Include   | Include   |
/// | present   | `false`  | Exclude   | Exclude   |
/// | present   | nested   | Descend   | Descend   |
/// | present   | missing  | Exclude   | Include   |
///
/// `select_all` short-circuits to `Include`; it is set when an ancestor
/// composite was selected wholesale.
pub fn decide<'a>(
    mask: Option<&'a SelectMask>,
    mode: SelectMode,
    select_all: bool,
    name: &str,
) -> Decision<'a> {
    if select_all {
        return Decision::Include;
    }
    let Some(mask) = mask else {
        return Decision::Include;
    };
    match (mask.get(name), mode) {
        (Some(SelectValue::Bool(true)), _) => Decision::Include,
        (Some(SelectValue::Bool(false)), _) => Decision::Exclude,
        (Some(SelectValue::Nested(nested)), _) => Decision::Descend(nested),
        (None, SelectMode::Include) => Decision::Exclude,
        (None, SelectMode::Exclude) => Decision::Include,
    }
}

/// The projection in effect at one level of the field walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection<'a> {
    /// Mask for this level; `None` below a wholesale selection or when no
    /// mask was supplied at all.
    pub mask: Option<&'a SelectMask>,
    /// Mode fixed at the root.
    pub mode: SelectMode,
    /// Everything on this level is selected.
    pub select_all: bool,
}

impl<'a> Projection<'a> {
    /// Projection for the root of a compilation.
    pub fn root(mask: Option<&'a SelectMask>, mode: SelectMode) -> Self {
        Self {
            mask,
            mode,
            select_all: false,
        }
    }

    /// Projection that selects nothing but still lets the walk traverse the
    /// structure. Always inclusive.
    pub fn empty() -> Self {
        Self {
            mask: Some(&EMPTY_MASK),
            mode: SelectMode::Include,
            select_all: false,
        }
    }

    /// Evaluate this projection for a field.
    pub fn decide(&self, name: &str) -> Decision<'a> {
        decide(self.mask, self.mode, self.select_all, name)
    }

    /// Projection for descending into a composite after `decision`.
    ///
    /// Returns `None` for [`Decision::Exclude`].
    pub fn descend(&self, decision: Decision<'a>) -> Option<Self> {
        match decision {
            Decision::Exclude => None,
            Decision::Include => Some(Self {
                mask: None,
                mode: self.mode,
                select_all: true,
            }),
            Decision::Descend(mask) => Some(Self {
                mask: Some(mask),
                mode: self.mode,
                select_all: false,
            }),
        }
    }

    /// Check whether this projection selects specific columns (as opposed
    /// to everything).
    pub fn is_partial(&self) -> bool {
        self.mask.is_some() && !self.select_all
    }

    /// Check whether this projection is the degenerate empty inclusive mask.
    pub fn is_empty(&self) -> bool {
        !self.select_all
            && self.mode == SelectMode::Include
            && self.mask.is_some_and(SelectMask::is_empty)
    }
}
