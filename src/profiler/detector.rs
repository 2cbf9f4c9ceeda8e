//! 샌드위치 트리플 탐지
//!
//! 정렬된 스왑 목록에서 희생자 후보마다 같은 블록 ± 윈도 범위의
//! 앞/뒤 스왑을 훑어 front/victim/back 트리플을 찾는다. 최초로
//! 조건을 만족하는 쌍에서 멈춘다 - 최적 쌍 탐색이 아니라 존재
//! 확인이며, 재현율을 우선한 의도적 트레이드오프다.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AttackerStats, NormalizedSwap};

/// 탐지 파라미터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Scan window around the victim's block, in blocks.
    pub window_blocks: u64,
    /// Both attacker legs must exceed this dollar size (dust filter).
    pub min_leg_usd: f64,
    /// Absolute floor on the implied attacker profit.
    pub min_profit_usd: f64,
    /// Implied profit above this multiple of the victim's size is an
    /// unrelated-trade false positive, not a sandwich.
    pub max_profit_to_victim_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_blocks: 2,
            min_leg_usd: 100.0,
            min_profit_usd: 10.0,
            max_profit_to_victim_ratio: 2.0,
        }
    }
}

/// Aggregated result of one detection pass.
#[derive(Debug, Clone, Default)]
pub struct DetectionSummary {
    pub sandwich_count: u32,
    pub attacker_totals: HashMap<Address, (u32, f64)>,
}

impl DetectionSummary {
    /// Attackers ranked by attack count, then extracted value.
    pub fn top_attackers(&self, limit: usize) -> Vec<AttackerStats> {
        let mut ranked: Vec<AttackerStats> = self
            .attacker_totals
            .iter()
            .map(|(address, (count, usd))| AttackerStats {
                address: *address,
                attack_count: *count,
                extracted_usd: *usd,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.attack_count
                .cmp(&a.attack_count)
                .then(b.extracted_usd.total_cmp(&a.extracted_usd))
                .then(a.address.cmp(&b.address))
        });
        ranked.truncate(limit);
        ranked
    }
}

/// Mark sandwiched victims in place and tally attackers.
///
/// Swaps must already be sorted by (block_number, log_index); that
/// ordering carries the front-precedes-victim / back-follows-victim
/// constraints.
pub fn detect(swaps: &mut [NormalizedSwap], config: &DetectorConfig) -> DetectionSummary {
    let mut summary = DetectionSummary::default();

    for victim_idx in 0..swaps.len() {
        let victim = swaps[victim_idx].clone();

        let mut matched: Option<(usize, usize)> = None;

        // 앞쪽 윈도: 희생자보다 먼저 체결된 같은 방향 스왑
        'front: for front_idx in (0..victim_idx).rev() {
            let front = &swaps[front_idx];
            if victim.block_number - front.block_number > config.window_blocks {
                break;
            }
            if front.sender == victim.sender {
                continue;
            }
            if front.direction != victim.direction {
                continue;
            }
            if front.amount_in_usd < config.min_leg_usd {
                continue;
            }

            // 뒤쪽 윈도: 같은 공격자가 반대 방향으로 되파는 스왑
            for back_idx in victim_idx + 1..swaps.len() {
                let back = &swaps[back_idx];
                if back.block_number - victim.block_number > config.window_blocks {
                    break;
                }
                if back.sender != front.sender {
                    continue;
                }
                if back.direction != front.direction.opposite() {
                    continue;
                }
                if back.amount_out_usd < config.min_leg_usd {
                    continue;
                }

                let implied_profit = back.amount_out_usd - front.amount_in_usd;
                if implied_profit < config.min_profit_usd {
                    continue;
                }
                if implied_profit > config.max_profit_to_victim_ratio * victim.amount_in_usd {
                    continue;
                }

                matched = Some((front_idx, back_idx));
                break 'front;
            }
        }

        if let Some((front_idx, back_idx)) = matched {
            let attacker = swaps[front_idx].sender;
            let implied_profit =
                swaps[back_idx].amount_out_usd - swaps[front_idx].amount_in_usd;

            let victim = &mut swaps[victim_idx];
            victim.sandwiched = true;
            victim.attacker = Some(attacker);

            summary.sandwich_count += 1;
            let entry = summary.attacker_totals.entry(attacker).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += implied_profit;

            debug!(
                "🥪 샌드위치 확인: victim block {} idx {} / attacker {}",
                victim.block_number, victim.log_index, attacker
            );
        }
    }

    summary
}
