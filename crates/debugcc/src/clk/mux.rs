//! Debug multiplexer node.
//!
//! A [`MuxNode`] is the validated form of a [`MuxConfig`]: register geometry, the
//! selector and post-divider fields, and the parent table. It knows how to program
//! itself through a [`RegisterWindow`] but never owns one; the registry binds windows
//! and hands them in per call.

use std::collections::HashSet;

use crate::common::constants::{CBCR_ENA, REG_WIDTH};
use crate::common::error::{ConfigError, DebugCcError};
use crate::common::field::{Field, read_field, write_field};
use crate::config::MuxConfig;
use crate::soc::traits::RegisterWindow;

/// The branch enable bit of a cbcr register.
const CBCR_ENABLE: Field = Field::new(CBCR_ENA, 0);

/// One row of a mux's parent table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentEntry {
    /// Parent clock name.
    pub name: String,
    /// Selector code routing this parent to the mux output.
    pub sel: u32,
    /// Divider applied to this parent before it reaches the mux.
    pub pre_div: u32,
}

/// A validated debug multiplexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxNode {
    name: String,
    window: String,
    debug_offset: u64,
    post_div_offset: u64,
    cbcr_offset: Option<u64>,
    src_sel: Field,
    post_div: Field,
    post_div_val: u32,
    parents: Vec<ParentEntry>,
}

impl MuxNode {
    /// Validates a mux description and builds the node.
    ///
    /// # Errors
    ///
    /// Any per-mux [`ConfigError`]: mismatched tables, malformed fields, selector codes that
    /// do not fit, zero dividers, duplicate parents, or a pass-through with several parents.
    pub fn from_config(cfg: &MuxConfig) -> Result<Self, ConfigError> {
        let name = cfg.name.clone();
        if cfg.parents.len() != cfg.sels.len() {
            return Err(ConfigError::TableLengthMismatch {
                mux: name,
                parents: cfg.parents.len(),
                sels: cfg.sels.len(),
            });
        }
        if let Some(pre_divs) = &cfg.pre_divs {
            if pre_divs.len() != cfg.parents.len() {
                return Err(ConfigError::PreDivLengthMismatch {
                    mux: name,
                    parents: cfg.parents.len(),
                    pre_divs: pre_divs.len(),
                });
            }
        }
        if cfg.parents.is_empty() {
            return Err(ConfigError::NoParents(name));
        }

        let src_sel = Field::new(cfg.src_sel_mask, cfg.src_sel_shift);
        let post_div = Field::new(cfg.post_div_mask, cfg.post_div_shift);
        for (label, field) in [("src_sel", src_sel), ("post_div", post_div)] {
            if !field.is_well_formed() {
                return Err(ConfigError::InvalidField {
                    mux: name,
                    field: label,
                    mask: field.mask,
                    shift: field.shift,
                });
            }
        }
        if !src_sel.is_present() && cfg.parents.len() > 1 {
            return Err(ConfigError::AmbiguousPassThrough {
                mux: name,
                parents: cfg.parents.len(),
            });
        }
        if cfg.post_div_val == 0 {
            return Err(ConfigError::ZeroDivider {
                clock: name,
                what: "post_div".into(),
            });
        }
        if post_div.is_present() && cfg.post_div_val > post_div.max_value() {
            return Err(ConfigError::InvalidField {
                mux: name,
                field: "post_div",
                mask: post_div.mask,
                shift: post_div.shift,
            });
        }
        for (what, offset) in [
            ("debug_offset", Some(cfg.debug_offset)),
            ("post_div_offset", Some(cfg.post_div_offset)),
            ("cbcr_offset", cfg.cbcr_offset),
        ] {
            if let Some(offset) = offset.filter(|o| o % REG_WIDTH != 0) {
                return Err(ConfigError::Misaligned {
                    clock: name,
                    what,
                    offset,
                });
            }
        }

        let mut seen = HashSet::new();
        let mut parents = Vec::with_capacity(cfg.parents.len());
        for (i, (parent, &sel)) in cfg.parents.iter().zip(&cfg.sels).enumerate() {
            if !seen.insert(parent.as_str()) {
                return Err(ConfigError::DuplicateParent {
                    mux: name,
                    parent: parent.clone(),
                });
            }
            if src_sel.is_present() && sel > src_sel.max_value() {
                return Err(ConfigError::SelectorOverflow {
                    mux: name,
                    parent: parent.clone(),
                    sel,
                    mask: src_sel.mask,
                });
            }
            let pre_div = cfg.pre_divs.as_ref().map_or(1, |p| p[i]);
            if pre_div == 0 {
                return Err(ConfigError::ZeroDivider {
                    clock: name,
                    what: parent.clone(),
                });
            }
            parents.push(ParentEntry {
                name: parent.clone(),
                sel,
                pre_div,
            });
        }

        Ok(Self {
            name,
            window: cfg.window.clone(),
            debug_offset: cfg.debug_offset,
            post_div_offset: cfg.post_div_offset,
            cbcr_offset: cfg.cbcr_offset,
            src_sel,
            post_div,
            post_div_val: cfg.post_div_val,
            parents,
        })
    }

    /// Clock name of the mux.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbolic name of the register window the mux lives in.
    pub fn window(&self) -> &str {
        &self.window
    }

    /// The parent table, in configuration order.
    pub fn parents(&self) -> &[ParentEntry] {
        &self.parents
    }

    /// Looks up a parent entry by exact name.
    pub fn parent(&self, name: &str) -> Option<&ParentEntry> {
        self.parents.iter().find(|p| p.name == name)
    }

    /// Returns `false` for a pass-through counter without a selector field.
    pub const fn has_selector(&self) -> bool {
        self.src_sel.is_present()
    }

    /// Selector field layout.
    pub const fn src_sel(&self) -> Field {
        self.src_sel
    }

    /// Post-divider field layout.
    pub const fn post_div(&self) -> Field {
        self.post_div
    }

    /// Fixed post-divider applied to measurements through this mux.
    pub const fn post_div_val(&self) -> u32 {
        self.post_div_val
    }

    /// Offset of the selector register.
    pub const fn debug_offset(&self) -> u64 {
        self.debug_offset
    }

    /// Offset of the post-divider register.
    pub const fn post_div_offset(&self) -> u64 {
        self.post_div_offset
    }

    /// Offset of the branch control register, if any.
    pub const fn cbcr_offset(&self) -> Option<u64> {
        self.cbcr_offset
    }

    /// Every register offset this mux touches, for bind-time range checks.
    pub fn register_offsets(&self) -> Vec<u64> {
        let mut offsets = Vec::with_capacity(3);
        if self.src_sel.is_present() {
            offsets.push(self.debug_offset);
        }
        if self.post_div.is_present() {
            offsets.push(self.post_div_offset);
        }
        offsets.extend(self.cbcr_offset);
        offsets
    }

    /// Routes `parent` to the mux output and programs the post-divider.
    ///
    /// Writes the selector code (skipped for pass-through nodes), then the fixed
    /// post-divider value (skipped when the mux has no post-divider field).
    ///
    /// # Returns
    ///
    /// The pre-divider of the selected parent entry.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::UnknownParent`] when `parent` is not in the table. No register is
    /// touched in that case.
    pub fn select_parent(
        &self,
        window: &mut dyn RegisterWindow,
        parent: &str,
    ) -> Result<u32, DebugCcError> {
        let entry = self.parent(parent).ok_or_else(|| DebugCcError::UnknownParent {
            mux: self.name.clone(),
            parent: parent.to_string(),
        })?;

        if self.src_sel.is_present() {
            write_field(window, self.debug_offset, self.src_sel, entry.sel);
        }
        self.program_post_div(window);
        Ok(entry.pre_div)
    }

    /// Writes the fixed post-divider value, if the mux has a post-divider field.
    pub fn program_post_div(&self, window: &mut dyn RegisterWindow) {
        if self.post_div.is_present() {
            write_field(window, self.post_div_offset, self.post_div, self.post_div_val);
        }
    }

    /// Decodes the selector field back to a parent entry.
    ///
    /// A pass-through node always reports its single parent. Returns `None` when the
    /// programmed code matches no table entry.
    pub fn current_parent(&self, window: &mut dyn RegisterWindow) -> Option<&ParentEntry> {
        if !self.src_sel.is_present() {
            return self.parents.first();
        }
        let sel = read_field(window, self.debug_offset, self.src_sel);
        self.parents.iter().find(|p| p.sel == sel)
    }

    /// Sets or clears the enable bit of the mux's branch control register.
    pub fn set_branch(&self, window: &mut dyn RegisterWindow, enable: bool) {
        if let Some(offset) = self.cbcr_offset {
            write_field(window, offset, CBCR_ENABLE, u32::from(enable));
        }
    }
}
