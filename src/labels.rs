//! Label placement.
//!
//! Every icon can carry its label at one of eight anchors. A greedy
//! warm start picks the first anchor that clears everything placed
//! before it, then simulated annealing moves one label at a time to
//! lower the overlap energy. Moves are scored incrementally: only the
//! moved label's overlaps are recomputed.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::debug;

use crate::annealing::{AnnealCandidate, Annealer, Schedule};
use crate::collision::{overlap_area, rects_overlap, Rect};
use crate::error::EngineError;
use crate::prng::Pcg32;
use crate::types::{AnnealItem, AnnealParams, AnnealPlacement, Anchor, Point, TextAlign};

pub const LABEL_OVERLAP_WEIGHT: f64 = 10.0;
pub const ICON_OVERLAP_WEIGHT: f64 = 5.0;
pub const NON_DEFAULT_PENALTY: f64 = 0.5;

const DEFAULT_ANCHOR: Anchor = Anchor::Bottom;
const ANCHOR_COUNT: usize = Anchor::ALL.len();

// -- Geometry ------------------------------------------------------

/// Offset from the icon center to the label anchor point, and the text
/// alignment at that point.
pub fn anchor_offset(anchor: Anchor, icon_size: f64, font_size: f64) -> (f64, f64, TextAlign) {
    let r = icon_size / 2.0;
    let f = font_size;
    let diag = r * 0.7;
    match anchor {
        Anchor::Bottom => (0.0, r + 0.9 * f, TextAlign::Middle),
        Anchor::Right => (r + 4.0, 0.0, TextAlign::Start),
        Anchor::TopRight => (diag + 3.0, -(diag + 0.5 * f), TextAlign::Start),
        Anchor::Top => (0.0, -(r + 0.6 * f), TextAlign::Middle),
        Anchor::TopLeft => (-(diag + 3.0), -(diag + 0.5 * f), TextAlign::End),
        Anchor::Left => (-(r + 4.0), 0.0, TextAlign::End),
        Anchor::BottomLeft => (-(diag + 3.0), diag + 0.5 * f, TextAlign::End),
        Anchor::BottomRight => (diag + 3.0, diag + 0.5 * f, TextAlign::Start),
    }
}

/// Label box for an anchor point: vertically centered on it, and
/// extending right, both ways or left depending on the alignment.
pub fn label_rect(anchor_point: Point, align: TextAlign, width: f64, height: f64) -> Rect {
    let (min_x, max_x) = match align {
        TextAlign::Start => (anchor_point.x, anchor_point.x + width),
        TextAlign::Middle => (anchor_point.x - width / 2.0, anchor_point.x + width / 2.0),
        TextAlign::End => (anchor_point.x - width, anchor_point.x),
    };
    Rect::new(min_x, anchor_point.y - height / 2.0, max_x, anchor_point.y + height / 2.0)
}

pub fn icon_rect(item: &AnnealItem) -> Rect {
    let size = item.icon_size.max(0.0);
    Rect::from_center(Point::new(item.x, item.y), size, size)
}

/// Per-item geometry for every anchor, computed once and shared by all
/// candidate states.
#[derive(Debug)]
struct LabelGeometry {
    names: Vec<String>,
    icons: Vec<Rect>,
    labels: Vec<[Rect; ANCHOR_COUNT]>,
    placements: Vec<[AnnealPlacement; ANCHOR_COUNT]>,
}

impl LabelGeometry {
    fn new(items: &[AnnealItem], default_font: f64) -> Self {
        let mut geometry = LabelGeometry {
            names: Vec::with_capacity(items.len()),
            icons: Vec::with_capacity(items.len()),
            labels: Vec::with_capacity(items.len()),
            placements: Vec::with_capacity(items.len()),
        };
        for item in items {
            let font = item.font_size.unwrap_or(default_font);
            let width = item.label_width.max(0.0);
            let height = item.label_height.max(0.0);
            let center = Point::new(item.x, item.y);
            let offsets = Anchor::ALL.map(|a| (a, anchor_offset(a, item.icon_size, font)));
            geometry.names.push(item.name.clone());
            geometry.icons.push(icon_rect(item));
            geometry.labels.push(
                offsets.map(|(_, (dx, dy, align))| label_rect(center.add(Point::new(dx, dy)), align, width, height)),
            );
            geometry.placements.push(offsets.map(|(anchor, (dx, dy, text_anchor))| AnnealPlacement {
                anchor,
                dx,
                dy,
                text_anchor,
            }));
        }
        geometry
    }

    fn len(&self) -> usize {
        self.names.len()
    }

    fn label(&self, item: usize, anchor: Anchor) -> &Rect {
        &self.labels[item][anchor.index()]
    }
}

// -- Energy --------------------------------------------------------

/// Energy terms involving item `i`'s label at `anchor`: its overlaps
/// with every other label and every other icon, plus the anchor
/// penalty.
fn item_energy(geometry: &LabelGeometry, anchors: &[Anchor], i: usize, anchor: Anchor) -> f64 {
    let rect = geometry.label(i, anchor);
    let mut e = 0.0;
    for j in 0..anchors.len() {
        if j == i {
            continue;
        }
        e += LABEL_OVERLAP_WEIGHT * overlap_area(rect, geometry.label(j, anchors[j]));
        e += ICON_OVERLAP_WEIGHT * overlap_area(rect, &geometry.icons[j]);
    }
    if anchor != DEFAULT_ANCHOR {
        e += NON_DEFAULT_PENALTY;
    }
    e
}

fn total_energy(geometry: &LabelGeometry, anchors: &[Anchor]) -> f64 {
    let n = anchors.len();
    let mut e = 0.0;
    for i in 0..n {
        let rect = geometry.label(i, anchors[i]);
        for j in 0..n {
            if j == i {
                continue;
            }
            if j > i {
                e += LABEL_OVERLAP_WEIGHT * overlap_area(rect, geometry.label(j, anchors[j]));
            }
            e += ICON_OVERLAP_WEIGHT * overlap_area(rect, &geometry.icons[j]);
        }
        if anchors[i] != DEFAULT_ANCHOR {
            e += NON_DEFAULT_PENALTY;
        }
    }
    e
}

/// Greedy initial assignment: in input order, the first anchor whose
/// label clears every earlier label and icon, else the default.
fn warm_start(geometry: &LabelGeometry) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::with_capacity(geometry.len());
    for i in 0..geometry.len() {
        let chosen = Anchor::ALL
            .into_iter()
            .find(|&a| {
                let rect = geometry.label(i, a);
                anchors.iter().enumerate().all(|(j, &placed)| {
                    !rects_overlap(rect, geometry.label(j, placed)) && !rects_overlap(rect, &geometry.icons[j])
                })
            })
            .unwrap_or(DEFAULT_ANCHOR);
        anchors.push(chosen);
    }
    anchors
}

// -- Candidate -----------------------------------------------------

/// One full anchor assignment with its cached energy.
#[derive(Debug, Clone)]
pub struct LabelLayout {
    geometry: Arc<LabelGeometry>,
    anchors: Vec<Anchor>,
    energy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelUndo {
    item: usize,
    anchor: Anchor,
    energy: f64,
}

impl LabelLayout {
    fn warm(geometry: Arc<LabelGeometry>) -> Self {
        let anchors = warm_start(&geometry);
        let energy = total_energy(&geometry, &anchors);
        Self {
            geometry,
            anchors,
            energy,
        }
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Energy recomputed from scratch.
    pub fn full_energy(&self) -> f64 {
        total_energy(&self.geometry, &self.anchors)
    }

    /// One placement per distinct item name; the first item wins.
    pub fn placements(&self) -> BTreeMap<String, AnnealPlacement> {
        let mut out = BTreeMap::new();
        for (i, anchor) in self.anchors.iter().enumerate() {
            out.entry(self.geometry.names[i].clone())
                .or_insert(self.geometry.placements[i][anchor.index()]);
        }
        out
    }
}

impl AnnealCandidate for LabelLayout {
    type Undo = Option<LabelUndo>;

    fn energy(&self) -> f64 {
        self.energy
    }

    fn step(&mut self, rng: &mut Pcg32) -> Option<LabelUndo> {
        if self.anchors.is_empty() {
            return None;
        }
        let item = rng.next_index(self.anchors.len());
        let old = self.anchors[item];
        let new = Anchor::from_index(rng.next_index_except(ANCHOR_COUNT, old.index()));
        let delta = item_energy(&self.geometry, &self.anchors, item, new)
            - item_energy(&self.geometry, &self.anchors, item, old);
        let undo = LabelUndo {
            item,
            anchor: old,
            energy: self.energy,
        };
        self.anchors[item] = new;
        self.energy += delta;
        Some(undo)
    }

    fn undo(&mut self, token: Option<LabelUndo>) {
        if let Some(t) = token {
            self.anchors[t.item] = t.anchor;
            self.energy = t.energy;
        }
    }
}

// -- Driver --------------------------------------------------------

/// Resumable label optimizer.
#[derive(Debug, Clone)]
pub struct LabelAnnealer {
    annealer: Annealer<LabelLayout>,
    warm_energy: f64,
}

impl LabelAnnealer {
    pub fn new(items: &[AnnealItem], params: &AnnealParams) -> Self {
        let geometry = Arc::new(LabelGeometry::new(items, params.font_size));
        let layout = LabelLayout::warm(geometry);
        let warm_energy = layout.energy();
        debug!(items = items.len(), warm_energy, "label warm start");
        Self {
            annealer: Annealer::new(layout, Schedule::from_params(params), params.seed),
            warm_energy,
        }
    }

    pub fn advance(&mut self, steps: u32) -> u32 {
        self.annealer.advance(steps)
    }

    pub fn is_finished(&self) -> bool {
        self.annealer.is_finished()
    }

    pub fn progress(&self) -> f64 {
        self.annealer.progress()
    }

    pub fn iteration(&self) -> u32 {
        self.annealer.iteration()
    }

    pub fn warm_energy(&self) -> f64 {
        self.warm_energy
    }

    pub fn best_energy(&self) -> f64 {
        self.annealer.best_energy()
    }

    pub fn best(&self) -> &LabelLayout {
        self.annealer.best()
    }

    pub fn placements(&self) -> BTreeMap<String, AnnealPlacement> {
        self.annealer.best().placements()
    }
}

/// Optimize label anchors, calling `on_progress` with the completed
/// fraction every `yield_interval` iterations. Returning
/// `ControlFlow::Break` stops early; the best placement found so far is
/// returned either way.
pub fn anneal_labels<F>(items: &[AnnealItem], params: &AnnealParams, mut on_progress: F) -> BTreeMap<String, AnnealPlacement>
where
    F: FnMut(f64) -> ControlFlow<()>,
{
    let mut annealer = LabelAnnealer::new(items, params);
    let slice = params.yield_interval.max(1);
    while !annealer.is_finished() {
        annealer.advance(slice);
        if on_progress(annealer.progress()).is_break() {
            debug!(iteration = annealer.iteration(), "label annealing cancelled");
            break;
        }
    }
    debug!(
        warm = annealer.warm_energy(),
        best = annealer.best_energy(),
        iterations = annealer.iteration(),
        "label annealing finished"
    );
    annealer.placements()
}

/// Label annealing on a background thread.
#[derive(Debug)]
pub struct LabelWorker {
    handle: JoinHandle<BTreeMap<String, AnnealPlacement>>,
    progress: Receiver<f64>,
    cancel: Arc<AtomicBool>,
}

impl LabelWorker {
    /// Progress fractions, one per yield.
    pub fn progress(&self) -> &Receiver<f64> {
        &self.progress
    }

    /// Ask the worker to stop at its next yield.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn join(self) -> Result<BTreeMap<String, AnnealPlacement>, EngineError> {
        self.handle.join().map_err(|_| EngineError::WorkerPanicked)
    }
}

pub fn spawn_label_annealer(items: Vec<AnnealItem>, params: AnnealParams) -> LabelWorker {
    let (tx, rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let stop = Arc::clone(&cancel);
    let handle = std::thread::spawn(move || {
        anneal_labels(&items, &params, |fraction| {
            // The receiver may already be gone; keep going regardless.
            let _ = tx.send(fraction);
            if stop.load(Ordering::Relaxed) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    });
    LabelWorker {
        handle,
        progress: rx,
        cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, x: f64, y: f64) -> AnnealItem {
        AnnealItem {
            name: name.into(),
            x,
            y,
            icon_size: 16.0,
            label_width: 40.0,
            label_height: 14.0,
            font_size: Some(12.0),
        }
    }

    /// 50 icons packed 30px apart in a 10x5 grid with wide labels.
    fn packed() -> Vec<AnnealItem> {
        (0..50)
            .map(|i| {
                let mut it = item(&format!("L{i}"), 100.0 + 30.0 * (i % 10) as f64, 100.0 + 30.0 * (i / 10) as f64);
                it.label_width = 50.0;
                it.icon_size = 12.0;
                it
            })
            .collect()
    }

    #[test]
    fn anchor_geometry() {
        let it = item("A", 100.0, 100.0);
        let (dx, dy, align) = anchor_offset(Anchor::Right, 16.0, 12.0);
        assert_eq!((dx, dy, align), (12.0, 0.0, TextAlign::Start));
        let rect = label_rect(Point::new(it.x + dx, it.y + dy), align, 40.0, 14.0);
        assert_eq!(rect, Rect::new(112.0, 93.0, 152.0, 107.0));

        let (_, dy, align) = anchor_offset(Anchor::Bottom, 16.0, 12.0);
        assert_eq!(align, TextAlign::Middle);
        assert!((dy - 18.8).abs() < 1e-12);
        assert_eq!(anchor_offset(Anchor::Left, 16.0, 12.0).2, TextAlign::End);

        // No anchor puts the label on its own icon.
        let geometry = LabelGeometry::new(&[it.clone()], 12.0);
        for a in Anchor::ALL {
            assert!(!rects_overlap(geometry.label(0, a), &geometry.icons[0]), "{a:?}");
        }
    }

    #[test]
    fn warm_start_skips_colliding_anchor() {
        let items = vec![item("Low", 100.0, 100.0), item("High", 100.0, 75.0)];
        let geometry = LabelGeometry::new(&items, 12.0);
        assert_eq!(warm_start(&geometry), vec![Anchor::Bottom, Anchor::Right]);
    }

    #[test]
    fn isolated_items_cost_nothing() {
        let items = vec![item("A", 100.0, 100.0), item("B", 400.0, 100.0), item("C", 100.0, 400.0)];
        let annealer = LabelAnnealer::new(&items, &AnnealParams::default());
        assert_eq!(annealer.warm_energy(), 0.0);
        let placements = annealer.placements();
        assert!(placements.values().all(|p| p.anchor == Anchor::Bottom));
    }

    #[test]
    fn incremental_energy_tracks_full_recompute() {
        let geometry = Arc::new(LabelGeometry::new(&packed(), 12.0));
        let mut layout = LabelLayout::warm(geometry);
        let mut rng = Pcg32::new(5, 0);
        for i in 0..2000 {
            let token = layout.step(&mut rng);
            if i % 3 == 0 {
                layout.undo(token);
            }
        }
        assert!((layout.energy() - layout.full_energy()).abs() < 1e-6);
    }

    #[test]
    fn annealing_beats_warm_start_on_packed_icons() {
        let items = packed();
        let mut energies: Vec<(f64, f64)> = (0..20)
            .map(|seed| {
                let params = AnnealParams {
                    seed,
                    ..AnnealParams::default()
                };
                let mut annealer = LabelAnnealer::new(&items, &params);
                while !annealer.is_finished() {
                    annealer.advance(500);
                }
                assert!(annealer.best_energy() <= annealer.warm_energy());
                assert!((annealer.best().full_energy() - annealer.best_energy()).abs() < 1e-6);
                (annealer.best_energy(), annealer.warm_energy())
            })
            .collect();
        energies.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (median, warm) = energies[energies.len() / 2];
        assert!(median < warm, "median {median} vs warm {warm}");
    }

    #[test]
    fn one_placement_per_item() {
        let items = packed();
        let out = anneal_labels(&items, &AnnealParams::default(), |_| ControlFlow::Continue(()));
        assert_eq!(out.len(), items.len());
        for it in &items {
            assert!(out.contains_key(&it.name));
        }
        assert!(anneal_labels(&[], &AnnealParams::default(), |_| ControlFlow::Continue(())).is_empty());
    }

    #[test]
    fn progress_is_reported_and_reaches_one() {
        let mut seen = Vec::new();
        anneal_labels(&packed(), &AnnealParams::default(), |p| {
            seen.push(p);
            ControlFlow::Continue(())
        });
        // About 1379 effective iterations in slices of 500.
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[test]
    fn break_returns_best_so_far() {
        let items = packed();
        let mut calls = 0;
        let out = anneal_labels(&items, &AnnealParams::default(), |_| {
            calls += 1;
            ControlFlow::Break(())
        });
        assert_eq!(calls, 1);
        assert_eq!(out.len(), items.len());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let items = packed();
        let params = AnnealParams::default();
        let a = anneal_labels(&items, &params, |_| ControlFlow::Continue(()));
        let b = anneal_labels(&items, &params, |_| ControlFlow::Continue(()));
        assert_eq!(a, b);
    }

    #[test]
    fn worker_reports_progress_and_joins() {
        let items = packed();
        let worker = spawn_label_annealer(items.clone(), AnnealParams::default());
        let out = worker.join().unwrap();
        assert_eq!(out.len(), items.len());
    }

    #[test]
    fn cancelled_worker_still_places_everything() {
        let items = packed();
        let worker = spawn_label_annealer(items.clone(), AnnealParams::default());
        worker.cancel();
        let first = worker.progress().recv().unwrap();
        assert!(first > 0.0);
        let out = worker.join().unwrap();
        assert_eq!(out.len(), items.len());
    }
}
