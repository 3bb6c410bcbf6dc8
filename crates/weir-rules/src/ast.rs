use ipnet::{Ipv4Net, Ipv6Net};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Block,
    Permit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpVersion {
    #[default]
    BothV4V6,
    V4Only,
    V6Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    All,
    Tcp,
    Udp,
}

/// Address constraints bucketed by family. Order within each bucket is the
/// authoring order, which installation order later depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpAddresses {
    pub v4: Vec<Ipv4Net>,
    pub v6: Vec<Ipv6Net>,
}

impl IpAddresses {
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

/// The predicate attached to a rule. The default value means "no
/// conditions": a rule reading `permit out all` carries exactly this.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterConditions {
    pub ip_version: IpVersion,
    pub transport: Transport,
    /// Application identity constraint; mutually exclusive with the other
    /// source fields.
    pub source_app: Option<String>,
    pub source_ips: IpAddresses,
    pub source_ports: Vec<u16>,
    pub dest_ips: IpAddresses,
    pub dest_ports: Vec<u16>,
    /// Reserved; the grammar does not produce it yet.
    pub interface_name: Option<String>,
}

impl FilterConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub action: Action,
    pub direction: Direction,
    pub conditions: FilterConditions,
}

/// An ordered sequence of rules. Order is the authoring order and is
/// preserved through installation, since it is observable when filters of
/// equal priority overlap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ruleset {
    pub filters: Vec<FilterRule>,
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::Permit => write!(f, "permit")?,
            Action::Block => write!(f, "block")?,
        }
        match self.direction {
            Direction::In => write!(f, " in")?,
            Direction::Out => write!(f, " out")?,
        }

        let c = &self.conditions;
        if c.is_none() {
            return write!(f, " all");
        }

        match c.ip_version {
            IpVersion::BothV4V6 => {}
            IpVersion::V4Only => write!(f, " inet")?,
            IpVersion::V6Only => write!(f, " inet6")?,
        }
        match c.transport {
            Transport::All => {}
            Transport::Tcp => write!(f, " proto tcp")?,
            Transport::Udp => write!(f, " proto udp")?,
        }

        if let Some(app) = &c.source_app {
            write!(f, " from \"{app}\"")?;
        } else if !c.source_ips.is_empty() || !c.source_ports.is_empty() {
            write!(f, " from")?;
            write_endpoint(f, &c.source_ips, &c.source_ports)?;
        }

        if !c.dest_ips.is_empty() || !c.dest_ports.is_empty() {
            write!(f, " to")?;
            write_endpoint(f, &c.dest_ips, &c.dest_ports)?;
        }

        Ok(())
    }
}

fn write_endpoint(
    f: &mut fmt::Formatter<'_>,
    ips: &IpAddresses,
    ports: &[u16],
) -> fmt::Result {
    if !ips.is_empty() {
        write!(f, " {{")?;
        let mut first = true;
        for net in &ips.v4 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{net}")?;
            first = false;
        }
        for net in &ips.v6 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{net}")?;
            first = false;
        }
        write!(f, "}}")?;
    }
    if !ports.is_empty() {
        write!(f, " port {{")?;
        for (index, port) in ports.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{port}")?;
        }
        write!(f, "}}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_conditions_are_none() {
        assert!(FilterConditions::none().is_none());

        let mut conditions = FilterConditions::none();
        conditions.transport = Transport::Tcp;
        assert!(!conditions.is_none());
    }

    #[test]
    fn rules_render_back_to_source_shape() {
        let rule = FilterRule {
            action: Action::Permit,
            direction: Direction::Out,
            conditions: FilterConditions {
                transport: Transport::Tcp,
                dest_ips: IpAddresses {
                    v4: vec!["10.0.0.0/8".parse().unwrap()],
                    v6: Vec::new(),
                },
                dest_ports: vec![443],
                ..FilterConditions::none()
            },
        };
        assert_eq!(
            rule.to_string(),
            "permit out proto tcp to {10.0.0.0/8} port {443}"
        );
    }

    #[test]
    fn unconditioned_rules_render_as_all() {
        let rule = FilterRule {
            action: Action::Block,
            direction: Direction::In,
            conditions: FilterConditions::none(),
        };
        assert_eq!(rule.to_string(), "block in all");
    }
}
