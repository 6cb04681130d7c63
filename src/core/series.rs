use crate::domain::model::WeightSample;
use std::collections::VecDeque;

/// 有界的歷史序列：只保留計算需要的尾端。
///
/// `len()` 等於 `min(總共加入的數量, capacity)`，所以以 `min(len, window)`
/// 夾住的回看結果和保留完整歷史時相同。
#[derive(Debug, Clone)]
pub struct Tail<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> Tail<T> {
    pub fn seeded(capacity: usize, seed: T) -> Self {
        let capacity = capacity.max(1);
        let mut items = VecDeque::with_capacity(capacity);
        items.push_back(seed);
        Self { items, capacity }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 倒數第 `n` 個（`n = 1` 為最新），`n` 超出範圍時回傳 None
    pub fn back(&self, n: usize) -> Option<T> {
        if n == 0 || n > self.items.len() {
            return None;
        }
        self.items.get(self.items.len() - n).copied()
    }

    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        let n = n.min(self.items.len());
        self.items.iter().skip(self.items.len() - n)
    }
}

/// 重量樣本歷史，建立時放入 (0, 0) 作為第一次計算的基準
#[derive(Debug, Clone)]
pub struct SampleSeries {
    samples: Tail<WeightSample>,
}

impl SampleSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Tail::seeded(capacity.max(2), WeightSample::new(0.0, 0.0)),
        }
    }

    pub fn push(&mut self, sample: WeightSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<WeightSample> {
        self.samples.back(1)
    }

    pub fn back(&self, n: usize) -> Option<WeightSample> {
        self.samples.back(n)
    }
}
