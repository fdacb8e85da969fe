// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// 每帧检测统计: 类别 → 数量, 每次从零重建

use super::types::Detection;

/// 按首次出现顺序统计各类别数量
pub fn count_labels(detections: &[Detection]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for det in detections {
        match counts.iter_mut().find(|(label, _)| *label == det.label) {
            Some((_, n)) => *n += 1,
            None => counts.push((det.label.clone(), 1)),
        }
    }
    counts
}

/// 状态栏文本, 例如 `Detected -> person: 2 | car: 1`
pub fn summarize(detections: &[Detection]) -> String {
    let counts = count_labels(detections);
    if counts.is_empty() {
        return "Detected -> None".to_string();
    }
    let info = counts
        .iter()
        .map(|(label, n)| format!("{}: {}", label, n))
        .collect::<Vec<_>>()
        .join(" | ");
    format!("Detected -> {}", info)
}
