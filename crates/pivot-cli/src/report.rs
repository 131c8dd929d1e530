//! Deployment outcome reporting

use std::process::ExitCode;

use console::style;
use pivot_core::{Error, PartialDeployment, ProxyRecord, Result};

/// Print the outcome of one proxy deployment
pub fn report(name: &str, result: &Result<ProxyRecord>) -> ExitCode {
    match result {
        Ok(record) => {
            println!("{}", success_line(record));
            ExitCode::SUCCESS
        }
        Err(err) => {
            for line in failure_lines(name, err) {
                eprintln!("{}", line);
            }
            ExitCode::FAILURE
        }
    }
}

fn success_line(record: &ProxyRecord) -> String {
    let address = record
        .proxy
        .map(|a| a.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} {} ({}) deployed to {} [{}, implementation {}, v{}]",
        style("✓").green(),
        style(&record.name).cyan(),
        record.implementation.contract,
        style(address).yellow(),
        record.kind,
        record.implementation.address,
        record.version
    )
}

fn failure_lines(name: &str, err: &Error) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} failed [{}]: {}",
        style("✗").red(),
        style(name).cyan(),
        err.code(),
        err
    )];
    if let Some(partial) = err.partial() {
        lines.extend(partial_lines(partial));
    }
    lines
}

fn partial_lines(partial: &PartialDeployment) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(implementation) = partial.implementation {
        lines.push(format!("  implementation deployed at {}", implementation));
    }
    if let Some(proxy) = partial.proxy {
        lines.push(format!("  proxy deployed at {}", proxy));
    }
    if let Some(stage) = partial.stage {
        lines.push(format!(
            "  {} recorded at stage {}, re-run to resume",
            style("⚠").yellow(),
            stage
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_core::{
        Address, DeploymentStep, ImplementationRecord, ProxyKind, ProxyStage, B256,
    };

    fn record() -> ProxyRecord {
        let mut record = ProxyRecord::new(
            "nft",
            ProxyKind::Uups,
            ImplementationRecord {
                contract: "NFTCollect".to_string(),
                address: Address::repeat_byte(0x11),
                bytecode_hash: B256::ZERO,
                tx_hash: None,
                storage_layout: None,
            },
        );
        record.proxy = Some(Address::repeat_byte(0x22));
        record.stage = ProxyStage::Initialized;
        record.version = 1;
        record
    }

    #[test]
    fn test_success_exit_code() {
        assert_eq!(report("nft", &Ok(record())), ExitCode::SUCCESS);
        let line = console::strip_ansi_codes(&success_line(&record())).to_string();
        assert!(line.contains(&Address::repeat_byte(0x22).to_string()));
        assert!(line.contains("NFTCollect"));
    }

    #[test]
    fn test_failure_exit_code() {
        let err = Error::ArtifactNotFound("NFTCollect".to_string());
        assert_eq!(report("nft", &Err(err)), ExitCode::FAILURE);
    }

    #[test]
    fn test_failure_lists_partial_deployment() {
        let err = Error::deployment_failed(
            DeploymentStep::DeployProxy,
            "transaction not confirmed after 120s",
            PartialDeployment {
                stage: Some(ProxyStage::ImplementationDeployed),
                implementation: Some(Address::repeat_byte(0x11)),
                proxy: None,
            },
        );
        let lines: Vec<String> = failure_lines("nft", &err)
            .iter()
            .map(|l| console::strip_ansi_codes(l).to_string())
            .collect();

        assert!(lines[0].contains("DEPLOYMENT_FAILED"));
        assert!(lines[0].contains("deploying the proxy"));
        assert!(lines[1].contains(&Address::repeat_byte(0x11).to_string()));
        assert!(lines[2].contains("implementation_deployed"));
        assert_eq!(lines.len(), 3);
    }
}
