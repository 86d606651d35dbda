//! Network topology configuration.
//!
//! Inert data from the pipeline's point of view: the network is provisioned
//! out of band, and these values are validated and displayed so an operator
//! can cross-check the environment a deployment lands in.

use serde::{Deserialize, Serialize};

use super::validation::valid_cidr;

/// Virtual network topology for the service environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address space of the network
    #[serde(default = "default_cidr")]
    pub cidr: String,

    /// Subnet mask applied to every subnet group
    #[serde(default = "default_subnet_mask")]
    pub subnet_mask: u8,

    /// Number of availability zones to spread subnets across
    #[serde(default = "default_max_azs")]
    pub max_azs: u32,

    /// NAT gateways (zero: isolated subnets reach services via endpoints)
    #[serde(default)]
    pub nat_gateways: u32,

    /// Name of the public subnet group
    #[serde(default = "default_public_subnet")]
    pub public_subnet_name: String,

    /// Name of the isolated subnet group the service tasks run in
    #[serde(default = "default_isolated_subnet")]
    pub isolated_subnet_name: String,

    /// Interface endpoints provisioned inside the network
    #[serde(default = "default_interface_endpoints")]
    pub interface_endpoints: Vec<String>,

    /// Gateway endpoints provisioned inside the network
    #[serde(default = "default_gateway_endpoints")]
    pub gateway_endpoints: Vec<String>,
}

fn default_cidr() -> String {
    "10.9.0.0/16".to_string()
}

fn default_subnet_mask() -> u8 {
    24
}

fn default_max_azs() -> u32 {
    2
}

fn default_public_subnet() -> String {
    "ingress".to_string()
}

fn default_isolated_subnet() -> String {
    "isolated".to_string()
}

fn default_interface_endpoints() -> Vec<String> {
    vec![
        "ecr".to_string(),
        "ecr-docker".to_string(),
        "secrets-manager".to_string(),
        "cloudwatch-logs".to_string(),
        "ssm-messages".to_string(),
    ]
}

fn default_gateway_endpoints() -> Vec<String> {
    vec!["s3".to_string()]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cidr: default_cidr(),
            subnet_mask: default_subnet_mask(),
            max_azs: default_max_azs(),
            nat_gateways: 0,
            public_subnet_name: default_public_subnet(),
            isolated_subnet_name: default_isolated_subnet(),
            interface_endpoints: default_interface_endpoints(),
            gateway_endpoints: default_gateway_endpoints(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self, errors: &mut Vec<String>) {
        if !valid_cidr(&self.cidr) {
            errors.push(format!("network.cidr is not a valid CIDR block: {}", self.cidr));
        }
        if !(16..=28).contains(&self.subnet_mask) {
            errors.push(format!(
                "network.subnet_mask must be between 16 and 28, got {}",
                self.subnet_mask
            ));
        }
        if self.max_azs == 0 {
            errors.push("network.max_azs must be at least 1".to_string());
        }
        if self.public_subnet_name.is_empty() || self.isolated_subnet_name.is_empty() {
            errors.push("network subnet group names must not be empty".to_string());
        }
    }
}
