use std::sync::Arc;

/// Scans update tool output for progress and success markers.
///
/// The default implementation matches SteamCMD's console text; a tool with a
/// structured protocol can supply its own parser.
pub trait UpdateOutputParser: Send {
    fn observe(&mut self, line: &str);

    /// The tool downloaded content during this run.
    fn got_new_version(&self) -> bool;

    /// The tool reported a completed install.
    fn download_successful(&self) -> bool;
}

/// Builds a parser for one tool run; the flag says whether output is captured.
pub type OutputParserFactory = Arc<dyn Fn(bool) -> Box<dyn UpdateOutputParser> + Send + Sync>;

const DOWNLOADING_MARKER: &str = "downloading,";
const SUCCESS_PREFIX: &str = "Success!";

#[derive(Debug, Clone, Default)]
pub struct SteamCmdOutputParser {
    got_new_version: bool,
    download_successful: bool,
}

impl SteamCmdOutputParser {
    /// Without captured output there is nothing to scan, so success then
    /// rests on the tool's exit code alone.
    pub fn new(output_captured: bool) -> Self {
        Self {
            got_new_version: false,
            download_successful: !output_captured,
        }
    }

    pub fn factory() -> OutputParserFactory {
        Arc::new(|captured: bool| -> Box<dyn UpdateOutputParser> {
            Box::new(SteamCmdOutputParser::new(captured))
        })
    }
}

impl UpdateOutputParser for SteamCmdOutputParser {
    fn observe(&mut self, line: &str) {
        if line.contains(DOWNLOADING_MARKER) {
            self.got_new_version = true;
        }
        if line.starts_with(SUCCESS_PREFIX) {
            self.download_successful = true;
        }
    }

    fn got_new_version(&self) -> bool {
        self.got_new_version
    }

    fn download_successful(&self) -> bool {
        self.download_successful
    }
}
