use crate::areas::repository::Repository;
use colored::Colorize;
use std::io::Write;

impl Repository {
    pub fn track(&self, patterns: &[String]) -> anyhow::Result<Vec<String>> {
        let added = self.workspace().track(patterns)?;

        for pattern in patterns {
            if added.contains(pattern) {
                writeln!(self.writer(), "{} {}", "Tracking".green(), pattern)?;
            } else {
                writeln!(self.writer(), "{} is already tracked", pattern.yellow())?;
            }
        }

        Ok(added)
    }
}
