use multistage_model::constants::COMMAND_PREAMBLE;

/// The shell script a step's container runs. The preamble is kept apart from the step's commands
/// until the pod is finished so injectors can add lines to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Script {
    preamble: Vec<String>,
    body: String,
}

impl Script {
    pub(crate) fn new<S: Into<String>>(body: S) -> Self {
        Self {
            preamble: COMMAND_PREAMBLE.iter().map(ToString::to_string).collect(),
            body: body.into(),
        }
    }

    pub(crate) fn push_preamble<S: Into<String>>(&mut self, line: S) {
        self.preamble.push(line.into());
    }

    pub(crate) fn render(&self) -> String {
        format!("{}\n{}", self.preamble.join("\n"), self.body)
    }
}

#[test]
fn preamble_comes_first() {
    let mut script = Script::new("make test");
    script.push_preamble("export FOO=bar");
    let rendered = script.render();
    assert!(rendered.starts_with("#!/bin/bash\nset -eu\n"));
    assert!(rendered.ends_with("\nexport FOO=bar\nmake test"));
}
