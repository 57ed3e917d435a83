//! Off-screen history of lines
//!
//! Lines that leave the top of the primary screen land here, newest at
//! index 0. Capacity policy is chosen at screen creation; the Distributed
//! policy draws on a process-wide budget shared by any number of screens.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::line::{Line, LineId};

/// How scrollback lines are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrollbackType {
    /// No lines are saved
    #[default]
    Disabled,
    /// At most this many lines, oldest evicted first
    Fixed(usize),
    /// Growth bounded only by process memory
    Unlimited,
    /// Lines come out of a budget shared across screens
    Distributed,
}

/// Process-wide line budget for `ScrollbackType::Distributed` screens.
///
/// Accounting is a single atomic counter plus a mutex-guarded table; the
/// lock is held only while acquiring or settling. A screen over budget is
/// never mutated from another thread - instead the least-recently-scrolled
/// screen is marked a debtor and releases its own oldest lines the next
/// time it touches its scrollback.
#[derive(Debug)]
pub struct ScrollbackBudget {
    capacity: usize,
    in_use: AtomicUsize,
    table: Mutex<Vec<BudgetEntry>>,
}

#[derive(Debug, Clone, Default)]
struct BudgetEntry {
    alive: bool,
    held: usize,
    owed: usize,
    last_scroll: u64,
}

/// A screen's slot in the shared budget table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSlot(usize);

impl ScrollbackBudget {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            in_use: AtomicUsize::new(0),
            table: Mutex::new(Vec::new()),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Relaxed)
    }

    pub fn register(&self) -> BudgetSlot {
        let mut table = self.table.lock().unwrap();
        if let Some(index) = table.iter().position(|e| !e.alive) {
            table[index] = BudgetEntry {
                alive: true,
                ..BudgetEntry::default()
            };
            return BudgetSlot(index);
        }
        table.push(BudgetEntry {
            alive: true,
            ..BudgetEntry::default()
        });
        BudgetSlot(table.len() - 1)
    }

    pub fn unregister(&self, slot: BudgetSlot) {
        let mut table = self.table.lock().unwrap();
        if let Some(entry) = table.get_mut(slot.0) {
            self.in_use.fetch_sub(entry.held, Ordering::Relaxed);
            *entry = BudgetEntry::default();
        }
    }

    /// Account one line for `slot`. Always succeeds; when over capacity the
    /// least-recently-scrolled live screen is told to give a line back.
    fn acquire(&self, slot: BudgetSlot) {
        let mut table = self.table.lock().unwrap();
        let clock = table.iter().map(|e| e.last_scroll).max().unwrap_or(0) + 1;
        if let Some(entry) = table.get_mut(slot.0) {
            entry.held += 1;
            entry.last_scroll = clock;
        }
        let used = self.in_use.fetch_add(1, Ordering::Relaxed) + 1;
        if used > self.capacity {
            if let Some(debtor) = table
                .iter_mut()
                .filter(|e| e.alive && e.held > e.owed)
                .min_by_key(|e| e.last_scroll)
            {
                debtor.owed += 1;
            }
        }
    }

    /// Lines `slot` currently owes back to the pool.
    fn owed(&self, slot: BudgetSlot) -> usize {
        let table = self.table.lock().unwrap();
        table.get(slot.0).map_or(0, |e| e.owed)
    }

    /// Record that `slot` gave back `n` lines.
    fn release(&self, slot: BudgetSlot, n: usize) {
        if n == 0 {
            return;
        }
        let mut table = self.table.lock().unwrap();
        if let Some(entry) = table.get_mut(slot.0) {
            let n = n.min(entry.held);
            entry.held -= n;
            entry.owed = entry.owed.saturating_sub(n);
            self.in_use.fetch_sub(n, Ordering::Relaxed);
        }
    }
}

/// The scrollback buffer of one screen. Index 0 is the newest line.
#[derive(Debug, Default)]
pub struct Scrollback {
    lines: VecDeque<Line>,
    policy: ScrollbackType,
    budget: Option<(Arc<ScrollbackBudget>, BudgetSlot)>,
}

impl Scrollback {
    pub fn new(policy: ScrollbackType, budget: Option<Arc<ScrollbackBudget>>) -> Self {
        let budget = match policy {
            ScrollbackType::Distributed => budget.map(|b| {
                let slot = b.register();
                (b, slot)
            }),
            _ => None,
        };
        Self {
            lines: VecDeque::new(),
            policy,
            budget,
        }
    }

    pub fn policy(&self) -> ScrollbackType {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line by distance from the newest (0 = newest).
    pub fn line(&self, newest_index: usize) -> Option<&Line> {
        self.lines.get(newest_index)
    }

    pub fn line_mut(&mut self, newest_index: usize) -> Option<&mut Line> {
        self.lines.get_mut(newest_index)
    }

    /// Newest-first position of the line with the given id.
    pub fn position_of(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|l| l.id() == id)
    }

    /// Save a line that scrolled off the screen. Returns the number of old
    /// lines evicted to make room.
    pub fn push(&mut self, line: Line) -> Result<usize> {
        match self.policy {
            ScrollbackType::Disabled => Ok(0),
            ScrollbackType::Fixed(capacity) => {
                if capacity == 0 {
                    return Ok(0);
                }
                self.lines.push_front(line);
                let mut evicted = 0;
                while self.lines.len() > capacity {
                    self.lines.pop_back();
                    evicted += 1;
                }
                Ok(evicted)
            }
            ScrollbackType::Unlimited => {
                if self.lines.try_reserve(1).is_err() {
                    return Err(Error::NotEnoughMemory);
                }
                self.lines.push_front(line);
                Ok(0)
            }
            ScrollbackType::Distributed => {
                let Some((budget, slot)) = self.budget.clone() else {
                    // No pool attached; degrade to disabled
                    return Ok(0);
                };
                if self.lines.try_reserve(1).is_err() {
                    return Err(Error::NotEnoughMemory);
                }
                budget.acquire(slot);
                self.lines.push_front(line);
                let owed = budget.owed(slot);
                let mut evicted = 0;
                for _ in 0..owed {
                    if self.lines.pop_back().is_some() {
                        evicted += 1;
                    }
                }
                budget.release(slot, evicted);
                Ok(evicted)
            }
        }
    }

    /// Take back the newest line (rows grew; content returns to the grid).
    pub fn pop_newest(&mut self) -> Option<Line> {
        let line = self.lines.pop_front();
        if line.is_some() {
            if let Some((budget, slot)) = &self.budget {
                budget.release(*slot, 1);
            }
        }
        line
    }

    /// Drop every saved line.
    pub fn clear(&mut self) {
        if let Some((budget, slot)) = &self.budget {
            budget.release(*slot, self.lines.len());
        }
        self.lines.clear();
    }

    /// Newest-to-oldest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Oldest-to-newest iteration (text order).
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().rev()
    }

    /// Replace the whole buffer (reflow); budget accounting is adjusted.
    pub fn replace_lines(&mut self, lines: VecDeque<Line>) {
        if let Some((budget, slot)) = &self.budget {
            let old = self.lines.len();
            let new = lines.len();
            if new > old {
                for _ in old..new {
                    budget.acquire(*slot);
                }
            } else {
                budget.release(*slot, old - new);
            }
        }
        self.lines = lines;
    }

    /// Take the whole buffer, oldest first (reflow).
    pub fn take_lines_oldest_first(&mut self) -> Vec<Line> {
        let mut lines: Vec<Line> = self.lines.drain(..).collect();
        lines.reverse();
        lines
    }
}

impl Drop for Scrollback {
    fn drop(&mut self) {
        if let Some((budget, slot)) = self.budget.take() {
            budget.unregister(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::AttributeWord;
    use crate::line::LineIdAllocator;

    fn make_line(ids: &mut LineIdAllocator, text: &str) -> Line {
        let mut line = Line::new(ids.next_id());
        for (i, c) in text.chars().enumerate() {
            line.put_char(i, c, AttributeWord::default(), 80);
        }
        line
    }

    #[test]
    fn test_disabled_drops_everything() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Disabled, None);
        sb.push(make_line(&mut ids, "x")).unwrap();
        assert!(sb.is_empty());
    }

    #[test]
    fn test_newest_is_index_zero() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Fixed(10), None);
        sb.push(make_line(&mut ids, "first")).unwrap();
        sb.push(make_line(&mut ids, "second")).unwrap();
        assert_eq!(sb.line(0).unwrap().text(80), "second");
        assert_eq!(sb.line(1).unwrap().text(80), "first");
    }

    #[test]
    fn test_fixed_evicts_oldest() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Fixed(3), None);
        for i in 0..5 {
            let evicted = sb.push(make_line(&mut ids, &format!("line{i}"))).unwrap();
            assert_eq!(evicted, usize::from(i >= 3));
        }
        assert_eq!(sb.len(), 3);
        assert_eq!(sb.line(0).unwrap().text(80), "line4");
        assert_eq!(sb.line(2).unwrap().text(80), "line2");
    }

    #[test]
    fn test_unlimited_keeps_all() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Unlimited, None);
        for i in 0..100 {
            sb.push(make_line(&mut ids, &format!("{i}"))).unwrap();
        }
        assert_eq!(sb.len(), 100);
    }

    #[test]
    fn test_pop_newest() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Fixed(10), None);
        sb.push(make_line(&mut ids, "a")).unwrap();
        sb.push(make_line(&mut ids, "b")).unwrap();
        assert_eq!(sb.pop_newest().unwrap().text(80), "b");
        assert_eq!(sb.len(), 1);
    }

    #[test]
    fn test_position_by_id() {
        let mut ids = LineIdAllocator::default();
        let mut sb = Scrollback::new(ScrollbackType::Fixed(10), None);
        let line = make_line(&mut ids, "a");
        let id = line.id();
        sb.push(line).unwrap();
        sb.push(make_line(&mut ids, "b")).unwrap();
        assert_eq!(sb.position_of(id), Some(1));
    }

    #[test]
    fn test_distributed_budget_reclaims_least_recently_scrolled() {
        let budget = ScrollbackBudget::new(4);
        let mut ids = LineIdAllocator::default();
        let mut quiet = Scrollback::new(ScrollbackType::Distributed, Some(budget.clone()));
        let mut busy = Scrollback::new(ScrollbackType::Distributed, Some(budget.clone()));

        for i in 0..3 {
            quiet.push(make_line(&mut ids, &format!("q{i}"))).unwrap();
        }
        // The busy screen keeps scrolling past the shared capacity; the
        // quiet screen becomes the debtor but gives lines back itself.
        for i in 0..4 {
            busy.push(make_line(&mut ids, &format!("b{i}"))).unwrap();
        }
        assert!(budget.in_use() <= 4 + budget_owed_total(&budget));
        let owed_before = budget_owed_total(&budget);
        assert!(owed_before > 0);
        quiet.push(make_line(&mut ids, "settle")).unwrap();
        assert!(budget_owed_total(&budget) < owed_before + 1);
        assert!(quiet.len() < 4);
    }

    fn budget_owed_total(budget: &ScrollbackBudget) -> usize {
        budget.table.lock().unwrap().iter().map(|e| e.owed).sum()
    }

    #[test]
    fn test_budget_unregister_frees_lines() {
        let budget = ScrollbackBudget::new(10);
        let mut ids = LineIdAllocator::default();
        {
            let mut sb = Scrollback::new(ScrollbackType::Distributed, Some(budget.clone()));
            for i in 0..5 {
                sb.push(make_line(&mut ids, &format!("{i}"))).unwrap();
            }
            assert_eq!(budget.in_use(), 5);
        }
        assert_eq!(budget.in_use(), 0);
    }
}
