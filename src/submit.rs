use crate::michelson::{Parameters, Value};
use anyhow::Result;

/// Write access to the chain: signing, injecting and waiting for inclusion
/// all live behind this. Both calls return the operation hash.
pub trait Submitter {
    fn call_contract(
        &self,
        signer: &str,
        target: &str,
        parameters: &Parameters,
    ) -> Result<String>;

    fn originate(
        &self,
        signer: &str,
        code: &serde_json::Value,
        storage: &Value,
    ) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Submitter;
    use crate::michelson::{Parameters, Value};
    use anyhow::{anyhow, Result};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Submitted {
        Call {
            signer: String,
            target: String,
            parameters: Parameters,
        },
        Origination {
            signer: String,
            storage: Value,
        },
    }

    /// Keeps everything it is asked to submit.
    #[derive(Default)]
    pub(crate) struct RecordingSubmitter {
        pub should_error: bool,
        pub submitted: RefCell<Vec<Submitted>>,
    }

    impl Submitter for RecordingSubmitter {
        fn call_contract(
            &self,
            signer: &str,
            target: &str,
            parameters: &Parameters,
        ) -> Result<String> {
            if self.should_error {
                return Err(anyhow!("test should fail"));
            }
            self.submitted
                .borrow_mut()
                .push(Submitted::Call {
                    signer: signer.to_string(),
                    target: target.to_string(),
                    parameters: parameters.clone(),
                });
            Ok("operationHash".to_string())
        }

        fn originate(
            &self,
            signer: &str,
            _code: &serde_json::Value,
            storage: &Value,
        ) -> Result<String> {
            if self.should_error {
                return Err(anyhow!("test should fail"));
            }
            self.submitted
                .borrow_mut()
                .push(Submitted::Origination {
                    signer: signer.to_string(),
                    storage: storage.clone(),
                });
            Ok("originationHash".to_string())
        }
    }
}
