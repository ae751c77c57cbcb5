//! 6ステップ転流テーブル
//!
//! 各ステップで「PWM駆動するハイサイド相」「常時ONのローサイド相」「フローティング相」と、
//! フローティング相のBEMFゼロクロスを検出するためのコンパレータ設定を定義します。
//! テーブルは起動時に回転方向ストラップから一度だけ選択され、以後変更されません。

/// モーター相
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    A,
    B,
    C,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::A, Phase::B, Phase::C];

    /// 配列インデックス (A=0, B=1, C=2)
    pub const fn index(self) -> usize {
        match self {
            Phase::A => 0,
            Phase::B => 1,
            Phase::C => 2,
        }
    }
}

/// 回転方向（起動時にストラップピンから確定）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub const fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// 1ステップ分のハーフブリッジ状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriveState {
    /// PWM駆動されるハイサイド相
    pub high: Phase,
    /// ローサイドONの相
    pub low: Phase,
}

impl DriveState {
    pub const fn new(high: Phase, low: Phase) -> Self {
        Self { high, low }
    }

    /// 駆動されていない（BEMF検出用の）相
    pub const fn floating(&self) -> Phase {
        match (self.high, self.low) {
            (Phase::A, Phase::B) | (Phase::B, Phase::A) => Phase::C,
            (Phase::A, Phase::C) | (Phase::C, Phase::A) => Phase::B,
            _ => Phase::A,
        }
    }
}

/// ゼロクロスの向き（フローティング相の電圧が中性点を上/下に横切る）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Rising,
    Falling,
}

/// BEMFコンパレータ設定
///
/// `phase` を仮想中性点と比較する。`edge` が Falling の場合はコンパレータ出力を反転し、
/// キャプチャ側からは常に同じ論理エッジとして見えるようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SenseConfig {
    pub phase: Phase,
    pub edge: Edge,
}

impl SenseConfig {
    pub const fn new(phase: Phase, edge: Edge) -> Self {
        Self { phase, edge }
    }

    /// コンパレータ出力を反転する必要があるか
    pub const fn inverted(&self) -> bool {
        matches!(self.edge, Edge::Falling)
    }
}

/// 転流テーブルの1エントリ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommutationStep {
    pub drive: DriveState,
    pub sense: SenseConfig,
}

const fn step(high: Phase, low: Phase, edge: Edge) -> CommutationStep {
    let drive = DriveState::new(high, low);
    CommutationStep {
        drive,
        sense: SenseConfig::new(drive.floating(), edge),
    }
}

/// 正転: AH_BL, AH_CL, BH_CL, BH_AL, CH_AL, CH_BL
const FORWARD: [CommutationStep; 6] = [
    step(Phase::A, Phase::B, Edge::Falling),
    step(Phase::A, Phase::C, Edge::Rising),
    step(Phase::B, Phase::C, Edge::Falling),
    step(Phase::B, Phase::A, Edge::Rising),
    step(Phase::C, Phase::A, Edge::Falling),
    step(Phase::C, Phase::B, Edge::Rising),
];

/// 逆転: AH_BL, CH_BL, CH_AL, BH_AL, BH_CL, AH_CL
const REVERSE: [CommutationStep; 6] = [
    step(Phase::A, Phase::B, Edge::Rising),
    step(Phase::C, Phase::B, Edge::Falling),
    step(Phase::C, Phase::A, Edge::Rising),
    step(Phase::B, Phase::A, Edge::Falling),
    step(Phase::B, Phase::C, Edge::Rising),
    step(Phase::A, Phase::C, Edge::Falling),
];

/// ステップ数
pub const STEP_COUNT: u8 = 6;

/// 次のステップインデックス（0→1→…→5→0）
#[inline(always)]
pub const fn next_index(index: u8) -> u8 {
    (index + 1) % STEP_COUNT
}

/// 回転方向ごとの6ステップ転流テーブル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommutationTable {
    direction: Direction,
    steps: [CommutationStep; 6],
}

impl CommutationTable {
    pub const fn new(direction: Direction) -> Self {
        let steps = match direction {
            Direction::Forward => FORWARD,
            Direction::Reverse => REVERSE,
        };
        Self { direction, steps }
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// ステップを取得（インデックスは6で剰余）
    #[inline(always)]
    pub const fn step(&self, index: u8) -> CommutationStep {
        self.steps[(index % STEP_COUNT) as usize]
    }

    pub const fn drive(&self, index: u8) -> DriveState {
        self.step(index).drive
    }

    pub const fn sense(&self, index: u8) -> SenseConfig {
        self.step(index).sense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> [CommutationTable; 2] {
        [
            CommutationTable::new(Direction::Forward),
            CommutationTable::new(Direction::Reverse),
        ]
    }

    #[test]
    fn test_exactly_one_floating_phase() {
        for table in tables() {
            for i in 0..STEP_COUNT {
                let drive = table.drive(i);
                assert_ne!(drive.high, drive.low);
                let floating = drive.floating();
                assert_ne!(floating, drive.high);
                assert_ne!(floating, drive.low);
            }
        }
    }

    #[test]
    fn test_sense_watches_floating_phase() {
        for table in tables() {
            for i in 0..STEP_COUNT {
                let step = table.step(i);
                assert_eq!(step.sense.phase, step.drive.floating());
            }
        }
    }

    #[test]
    fn test_forward_sense_table() {
        let table = CommutationTable::new(Direction::Forward);
        let expected = [
            (Phase::C, Edge::Falling),
            (Phase::B, Edge::Rising),
            (Phase::A, Edge::Falling),
            (Phase::C, Edge::Rising),
            (Phase::B, Edge::Falling),
            (Phase::A, Edge::Rising),
        ];
        for (i, (phase, edge)) in expected.iter().enumerate() {
            assert_eq!(table.sense(i as u8), SenseConfig::new(*phase, *edge));
        }
    }

    #[test]
    fn test_reverse_sense_table() {
        let table = CommutationTable::new(Direction::Reverse);
        let expected = [
            (Phase::C, Edge::Rising),
            (Phase::A, Edge::Falling),
            (Phase::B, Edge::Rising),
            (Phase::C, Edge::Falling),
            (Phase::A, Edge::Rising),
            (Phase::B, Edge::Falling),
        ];
        for (i, (phase, edge)) in expected.iter().enumerate() {
            assert_eq!(table.sense(i as u8), SenseConfig::new(*phase, *edge));
        }
    }

    #[test]
    fn test_floating_phase_advances_every_step() {
        // 各ステップでフローティング相が変わり、6ステップで一巡する
        for table in tables() {
            let mut counts = [0u8; 3];
            for i in 0..STEP_COUNT {
                let now = table.drive(i).floating();
                let next = table.drive(next_index(i)).floating();
                assert_ne!(now, next);
                counts[now.index()] += 1;
            }
            assert_eq!(counts, [2, 2, 2]);
        }
    }

    #[test]
    fn test_next_index_wraps() {
        let mut index = 0;
        let mut visited = [0u8; 6];
        for k in 0..6 {
            visited[k] = index;
            index = next_index(index);
        }
        assert_eq!(visited, [0, 1, 2, 3, 4, 5]);
        assert_eq!(index, 0);
    }

    #[test]
    fn test_inverted_polarity() {
        assert!(SenseConfig::new(Phase::A, Edge::Falling).inverted());
        assert!(!SenseConfig::new(Phase::A, Edge::Rising).inverted());
    }
}
