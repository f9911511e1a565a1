pub mod context;
pub mod dom;
pub mod highlight;
pub mod io;
pub mod live;
pub mod locate;
pub mod parsing;
pub mod reading;

// Re-export key types for easier usage
pub use context::{DecorationEnv, DecorationVersion, PluginContext};
pub use dom::{Dom, NodeId};
pub use highlight::{HighlighterEvent, HighlighterState, SyntectTokenizer, Token, Tokenizer};
pub use io::*;
pub use live::{DecorationSet, EditorState, LiveDecorator, ViewUpdate, build_decorations};
pub use locate::*;
pub use parsing::{FenceParameters, LineNumbers, normalize, normalize_loose, parse_fence_parameters};
pub use reading::{
    CalloutObserver, DecorateOutcome, SourceContext, decorate, decorate_with_fence_line,
    process_lines, refresh_header,
};
