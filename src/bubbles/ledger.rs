// bubbles/ledger.rs
// The bubble lifecycle ledger. Owns the live bubble map, the append-only
// per-bubble records, the per-iteration event log and the sole id counter,
// and drives one tracking update from tagged fields to remapped tags.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write as IoWrite};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use ultraviolet::DVec2;

use crate::config;
use crate::grid::{BlockLayout, ScalarField2};
use crate::profile_scope;

use super::correlate::correlate_tags;
use super::tagger::BubbleMatch;
use super::transitions::{compute_bubble_transitions, BubbleTransition};

/// Live state of one bubble.
///
/// The reference volume is what the bubble was born with (inherited and
/// split proportionally through transitions); the current volume is the
/// latest measurement. Their ratio drives the gas pressure feedback.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BubbleInfo {
    reference_volume: f64,
    current_volume: f64,
    center: DVec2,
    frozen: bool,
}

impl BubbleInfo {
    pub fn new(volume: f64, center: DVec2) -> Self {
        Self { reference_volume: volume, current_volume: volume, center, frozen: false }
    }

    pub fn reference_volume(&self) -> f64 {
        self.reference_volume
    }

    pub fn current_volume(&self) -> f64 {
        self.current_volume
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// One-way: a frozen bubble never thaws.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn set_current_volume(&mut self, volume: f64) {
        self.current_volume = volume;
    }

    /// Compression ratio current/reference. A degenerate reference volume
    /// reads as uncompressed.
    pub fn volume_ratio(&self) -> f64 {
        if self.reference_volume.abs() < f64::EPSILON {
            1.0
        } else {
            self.current_volume / self.reference_volume
        }
    }
}

/// Lifetime record of one bubble, kept after its death.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullBubbleRecord {
    pub begin_iteration: u64,
    pub end_iteration: Option<u64>,
    pub initial_volume: f64,
    pub final_volume: f64,
    pub frozen: bool,
    pub begin_transition: BubbleTransition,
    pub end_transition: Option<BubbleTransition>,
}

impl FullBubbleRecord {
    fn new(initial_volume: f64, begin_iteration: u64, begin_transition: BubbleTransition) -> Self {
        Self {
            begin_iteration,
            end_iteration: None,
            initial_volume,
            final_volume: 0.0,
            frozen: false,
            begin_transition,
            end_transition: None,
        }
    }

    fn close(&mut self, iteration: u64, final_volume: f64, transition: BubbleTransition) {
        self.end_iteration = Some(iteration);
        self.final_volume = final_volume;
        self.end_transition = Some(transition);
    }

    /// One-line life summary for the full bubble log.
    pub fn description(&self, id: usize) -> String {
        let mut text = format!(
            "Bubble {}. Created at iteration {} with volume {:.6}",
            id, self.begin_iteration, self.initial_volume
        );
        if !self.begin_transition.old_ids.is_empty() {
            text += &format!(" out of bubble(s) {}", id_list(&self.begin_transition.old_ids));
        }
        text.push('.');
        match self.end_iteration {
            Some(end) => {
                text += &format!(" Removed at iteration {} with volume {:.6}", end, self.final_volume);
                if let Some(t) = &self.end_transition {
                    if !t.new_ids.is_empty() {
                        text += &format!(" into bubble(s) {}", id_list(&t.new_ids));
                    }
                }
                text.push('.');
            }
            None => text += " Still alive.",
        }
        if self.frozen {
            text += " Frozen.";
        }
        text
    }
}

fn id_list(ids: &BTreeSet<usize>) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" ")
}

/// Bubble ids created and removed within one iteration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IterationEvents {
    pub created: Vec<usize>,
    pub removed: Vec<usize>,
}

/// Cross-iteration bubble history.
///
/// Ids are handed out by this ledger alone, monotonically; an id is never
/// reused, and `records[id]` is the record of bubble `id` for all time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BubbleHistory {
    layout: BlockLayout,
    bubbles: BTreeMap<usize, BubbleInfo>,
    records: Vec<FullBubbleRecord>,
    time_history: BTreeMap<u64, IterationEvents>,
    next_bubble_id: usize,
    /// Previous iteration's tag field, already remapped to final ids.
    tags: ScalarField2<i32>,
}

impl BubbleHistory {
    pub fn new(layout: BlockLayout) -> Self {
        let tags = ScalarField2::new(layout.nx(), layout.ny(), -1);
        Self {
            layout,
            bubbles: BTreeMap::new(),
            records: Vec::new(),
            time_history: BTreeMap::new(),
            next_bubble_id: 0,
            tags,
        }
    }

    pub fn bubbles(&self) -> &BTreeMap<usize, BubbleInfo> {
        &self.bubbles
    }

    pub fn records(&self) -> &[FullBubbleRecord] {
        &self.records
    }

    pub fn time_history(&self) -> &BTreeMap<u64, IterationEvents> {
        &self.time_history
    }

    /// Remapped tag field of the latest tracked iteration.
    pub fn tags(&self) -> &ScalarField2<i32> {
        &self.tags
    }

    pub fn total_bubble_volume(&self) -> f64 {
        self.bubbles.values().map(BubbleInfo::current_volume).sum()
    }

    /// Absorb one iteration's tagged bubbles: correlate them against the
    /// previous iteration, group the overlaps into transitions, roll the
    /// live map and records forward, and retain the tag field rewritten to
    /// final ids.
    pub fn transition(&mut self, mut along: BubbleMatch, iteration: u64, volume_correction: f64) {
        profile_scope!("bubble_transition");
        let num_new = along.num_bubbles();
        let correlation = correlate_tags(&self.layout, &self.tags, &along.tags, num_new);

        // Invert the correlation, seeded with every live bubble so the ones
        // without any overlap surface as removal transitions.
        let mut old_to_all_new: BTreeMap<usize, Vec<usize>> =
            self.bubbles.keys().map(|&id| (id, Vec::new())).collect();
        for (new_id, olds) in correlation.new_to_all_old.iter().enumerate() {
            for &old_id in olds.iter() {
                old_to_all_new
                    .get_mut(&old_id)
                    .unwrap_or_else(|| panic!("correlated tag {} is not a live bubble", old_id))
                    .push(new_id);
            }
        }

        let transitions = compute_bubble_transitions(&correlation.new_to_all_old, &old_to_all_new);

        let mut new_bubbles = BTreeMap::new();
        let mut new_to_final = vec![-1i32; num_new];
        for transition in &transitions {
            self.compute_new_bubbles(
                transition,
                &along,
                volume_correction,
                &mut new_bubbles,
                &mut new_to_final,
            );
            self.update_bubble_log(transition, &along.volumes, iteration, &new_bubbles, &new_to_final);
        }
        self.bubbles = new_bubbles;

        apply_tag_remap(&mut along.tags, &new_to_final);
        self.tags = along.tags;
    }

    /// Build the next live map and the raw-to-final id remap, one transition
    /// at a time. Ids for genuinely new bubbles are drawn here, in transition
    /// order and ascending raw-tag order, which is exactly the order the log
    /// pass appends records in.
    fn compute_new_bubbles(
        &mut self,
        transition: &BubbleTransition,
        along: &BubbleMatch,
        volume_correction: f64,
        new_bubbles: &mut BTreeMap<usize, BubbleInfo>,
        new_to_final: &mut [i32],
    ) {
        if transition.old_ids.is_empty() {
            // A bubble is created from nothing.
            assert_eq!(transition.new_ids.len(), 1, "a creation carries exactly one new bubble");
            let raw = *transition.new_ids.first().unwrap();
            let id = self.next_bubble_id;
            self.next_bubble_id += 1;
            new_bubbles.insert(
                id,
                BubbleInfo::new(along.volumes[raw] * volume_correction, along.centers[raw]),
            );
            new_to_final[raw] = id as i32;
        } else if transition.new_ids.is_empty() {
            // A bubble vanishes into nothing; only the log pass has work.
            assert_eq!(transition.old_ids.len(), 1, "a removal carries exactly one old bubble");
        } else {
            // Renames, merges, splits and combinations thereof. The old
            // reference volumes are pooled and dealt out to the new bubbles
            // in proportion to their measured volumes.
            let mut total_reference = 0.0;
            let mut frozen = false;
            for old_id in &transition.old_ids {
                let info = self
                    .bubbles
                    .get(old_id)
                    .unwrap_or_else(|| panic!("transition references dead bubble {}", old_id));
                total_reference += info.reference_volume();
                frozen |= info.is_frozen();
            }
            let new_total: f64 = transition.new_ids.iter().map(|&raw| along.volumes[raw]).sum();

            let near_zero = f64::EPSILON * 1.0e4;
            let pure = transition.old_ids.len() == 1 && transition.new_ids.len() == 1;
            for &raw in &transition.new_ids {
                let measured = along.volumes[raw];
                // Degenerate total: keep the measured volume as reference
                // rather than dividing by almost nothing.
                let reference = if new_total.abs() > near_zero {
                    measured * total_reference / new_total
                } else {
                    measured
                };
                let id = if pure {
                    *transition.old_ids.first().unwrap()
                } else {
                    let id = self.next_bubble_id;
                    self.next_bubble_id += 1;
                    id
                };
                let mut info = BubbleInfo::new(reference, along.centers[raw]);
                info.set_current_volume(measured);
                if frozen {
                    info.freeze();
                }
                new_bubbles.insert(id, info);
                new_to_final[raw] = id as i32;
            }
        }
    }

    /// Append this transition to the per-bubble records and the iteration
    /// event log. Records are stored under final ids; initial volumes index
    /// the measurements by raw tag.
    fn update_bubble_log(
        &mut self,
        transition: &BubbleTransition,
        volumes: &[f64],
        iteration: u64,
        new_bubbles: &BTreeMap<usize, BubbleInfo>,
        new_to_final: &[i32],
    ) {
        let final_ids: BTreeSet<usize> =
            transition.new_ids.iter().map(|&raw| new_to_final[raw] as usize).collect();
        let logged = BubbleTransition {
            old_ids: transition.old_ids.clone(),
            new_ids: final_ids,
        };

        if transition.old_ids.is_empty() {
            let raw = *transition.new_ids.first().unwrap();
            let id = new_to_final[raw] as usize;
            assert_eq!(self.records.len(), id, "record arena out of sync with bubble ids");
            self.records.push(FullBubbleRecord::new(volumes[raw], iteration, logged));
            self.time_history.entry(iteration).or_default().created.push(id);
        } else if transition.new_ids.is_empty() {
            let old_id = *transition.old_ids.first().unwrap();
            assert!(self.records.len() > old_id, "removal of unrecorded bubble {}", old_id);
            self.records[old_id].close(iteration, 0.0, logged);
            self.time_history.entry(iteration).or_default().removed.push(old_id);
        } else if !(transition.old_ids.len() == 1 && transition.new_ids.len() == 1) {
            for &old_id in &transition.old_ids {
                let final_volume = self
                    .bubbles
                    .get(&old_id)
                    .unwrap_or_else(|| panic!("transition references dead bubble {}", old_id))
                    .current_volume();
                assert!(self.records.len() > old_id, "merge/split of unrecorded bubble {}", old_id);
                self.records[old_id].close(iteration, final_volume, logged.clone());
                self.time_history.entry(iteration).or_default().removed.push(old_id);
            }
            for &raw in &transition.new_ids {
                let id = new_to_final[raw] as usize;
                let mut record = FullBubbleRecord::new(volumes[raw], iteration, logged.clone());
                record.frozen = new_bubbles
                    .get(&id)
                    .unwrap_or_else(|| panic!("new bubble {} missing from the next map", id))
                    .is_frozen();
                assert_eq!(self.records.len(), id, "record arena out of sync with bubble ids");
                self.records.push(record);
                self.time_history.entry(iteration).or_default().created.push(id);
            }
        }
        // Pure renames leave the record running.
    }

    /// Write the bubble gas density into the outside-density field: inside a
    /// bubble's area the reference density scaled by its compression ratio,
    /// capped at `MAX_BUBBLE_DENSITY_RATIO`; the reference density elsewhere.
    pub fn update_bubble_pressure(
        &self,
        outside_density: &mut ScalarField2<f64>,
        rho_empty: f64,
    ) {
        profile_scope!("bubble_pressure");
        let nx = self.layout.nx();
        let cap = config::MAX_BUBBLE_DENSITY_RATIO * rho_empty;
        let (tags, bubbles) = (&self.tags, &self.bubbles);
        outside_density
            .data_mut()
            .par_chunks_mut(nx)
            .zip(tags.data().par_chunks(nx))
            .for_each(|(density_row, tag_row)| {
                for (density, &tag) in density_row.iter_mut().zip(tag_row) {
                    if tag >= 0 {
                        let info = bubbles
                            .get(&(tag as usize))
                            .unwrap_or_else(|| panic!("tag {} is not a live bubble", tag));
                        *density = (rho_empty * info.volume_ratio()).min(cap);
                    } else {
                        *density = rho_empty;
                    }
                }
            });
    }

    /// Freeze every live bubble and mirror the flag into its record.
    pub fn freeze(&mut self) {
        for (&id, info) in self.bubbles.iter_mut() {
            info.freeze();
            assert!(self.records.len() > id, "live bubble {} has no record", id);
            self.records[id].frozen = true;
        }
    }

    /// Per-iteration creation/removal log, one line per iteration that had
    /// events.
    pub fn time_history_text(&self) -> String {
        let mut text = String::new();
        for (&step, events) in &self.time_history {
            text += &format!("Iteration {:>8}.  ", step);
            if !events.created.is_empty() {
                text += "Created bubble(s) with ID";
                for id in &events.created {
                    text += &format!(" {}", id);
                }
                text += ".";
            }
            if !events.removed.is_empty() {
                text += " Removed bubble(s) with ID";
                for id in &events.removed {
                    text += &format!(" {}", id);
                }
                text += ".";
            }
            text.push('\n');
        }
        text
    }

    /// One line per bubble ever created, in id order.
    pub fn full_record_text(&self) -> String {
        let mut text = String::new();
        for (id, record) in self.records.iter().enumerate() {
            text += &record.description(id);
            text.push('\n');
        }
        text
    }

    pub fn write_time_history_log<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(self.time_history_text().as_bytes())
    }

    pub fn write_full_bubble_log<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(self.full_record_text().as_bytes())
    }
}

/// Rewrite raw tags to final ids in place, row-parallel.
fn apply_tag_remap(tags: &mut ScalarField2<i32>, remap: &[i32]) {
    profile_scope!("tag_remap");
    let nx = tags.nx();
    tags.data_mut().par_chunks_mut(nx).for_each(|row| {
        for tag in row {
            if *tag >= 0 {
                let mapped = remap[*tag as usize];
                debug_assert!(mapped >= 0, "raw tag {} left unmapped", tag);
                *tag = mapped;
            }
        }
    });
}
