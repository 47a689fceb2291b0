//! # Frame Assembler
//!
//! 中心视角 color + depth 配对、合并与落盘。
//!
//! 负责：
//! - 会话注册表 (session id → 会话)，回调只持有 session id
//! - 每个 (car, sector, simulation_id) 会话一个待配对槽位
//! - 非中心视角直接落盘，中心视角两半到齐后合并落盘
//!
//! ## 使用示例
//!
//! ```ignore
//! use frame_assembler::{FrameAssembler, SessionConfig};
//!
//! let assembler = Arc::new(FrameAssembler::new());
//! let session = assembler.open_session(SessionConfig::new("sedan", "main", "Town01_1", sink));
//!
//! // Called from sensor callbacks, on any thread
//! assembler.save_frame(session, &view_name, frame)?;
//!
//! assembler.close_session(session);
//! ```

mod assembler;
mod session;

pub use assembler::{AssemblerStats, FrameAssembler, SaveOutcome};
pub use session::{SessionConfig, SessionId};
