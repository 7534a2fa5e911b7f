//! Plan assertions in the style of a test framework: failures are recorded
//! through a [`Reporter`] and execution carries on.

use crate::error::HarnessError;
use crate::plan::{Plan, locate_attribute, locate_resource};

/// Test-runner sink.
pub trait Reporter {
    fn log(&mut self, message: &str);
    fn fail(&mut self, message: &str);
}

/// Prints log lines to stdout (captured per test by the test runner) and
/// remembers failures until [`Recorder::finish`].
///
/// Dropping a recorder that still holds failures panics, so a forgotten
/// `finish()` fails the test instead of passing it.
#[derive(Debug, Default)]
pub struct Recorder {
    logs: Vec<String>,
    failures: Vec<String>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn finish(mut self) -> Result<(), HarnessError> {
        let failures = std::mem::take(&mut self.failures);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::AssertionsFailed { failures })
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if !self.failures.is_empty() && !std::thread::panicking() {
            panic!(
                "{} unreported assertion failure(s):\n{}",
                self.failures.len(),
                self.failures.join("\n")
            );
        }
    }
}

impl Reporter for Recorder {
    fn log(&mut self, message: &str) {
        println!("{message}");
        tracing::info!("{message}");
        self.logs.push(message.to_string());
    }

    fn fail(&mut self, message: &str) {
        println!("FAIL: {message}");
        tracing::error!("{message}");
        self.failures.push(message.to_string());
    }
}

/// A loaded plan plus the assertions tests run against it.
#[derive(Debug, Clone)]
pub struct TestingPlan {
    pub plan: Plan,
}

impl TestingPlan {
    pub fn new(plan: Plan) -> Self {
        Self { plan }
    }

    pub fn assert_resource(&self, reporter: &mut dyn Reporter, resource_path: &str) -> bool {
        if locate_resource(&self.plan, resource_path).is_some() {
            reporter.log(&format!("Found {resource_path}"));
            true
        } else {
            reporter.fail(&format!(
                "Expected to find {resource_path} in {}",
                self.known_resources()
            ));
            false
        }
    }

    pub fn assert_resource_attribute(
        &self,
        reporter: &mut dyn Reporter,
        resource_path: &str,
        attribute_name: &str,
        expected: &str,
    ) -> bool {
        let Some(resource) = locate_resource(&self.plan, resource_path) else {
            reporter.fail(&format!(
                "Could not find {resource_path} in {}",
                self.known_resources()
            ));
            return false;
        };

        let Some(attribute) = locate_attribute(resource, attribute_name) else {
            let present: Vec<&str> = resource.attributes.keys().map(String::as_str).collect();
            reporter.fail(&format!(
                "Did not find {attribute_name} in {resource_path} (attributes: [{}])",
                present.join(", ")
            ));
            return false;
        };

        if attribute.new == expected {
            reporter.log(&format!(
                "Found {attribute_name} = {expected}, on {resource_path}"
            ));
            true
        } else {
            reporter.fail(&format!(
                "Expected {expected}, got {} for {attribute_name} attribute on {resource_path} resource",
                attribute.new
            ));
            false
        }
    }

    /// Planned value of an attribute, for comparisons the assertions don't
    /// cover (parsing a JSON policy document, for instance).
    pub fn attribute_new_value(&self, resource_path: &str, attribute_name: &str) -> Option<&str> {
        locate_resource(&self.plan, resource_path)
            .and_then(|resource| locate_attribute(resource, attribute_name))
            .map(|attribute| attribute.new.as_str())
    }

    fn known_resources(&self) -> String {
        format!("[{}]", self.plan.resource_keys().join(", "))
    }
}
