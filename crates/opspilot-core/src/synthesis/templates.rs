//! Category generators and default metric projections

use crate::config::SynthesisConfig;
use opspilot_model::{Action, Alert, Category, ImpactMetric, Severity};

/// Template keys accepted in `synthesis.metric_overrides`
pub const TEMPLATE_KEYS: [&str; 7] = [
    "maintenance.battery",
    "maintenance.equipment",
    "safety",
    "inventory",
    "slotting",
    "labor",
    "general",
];

/// Filled-in template for one alert
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub(crate) template: &'static str,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) actions: Vec<Action>,
    pub(crate) positive: Vec<String>,
    pub(crate) negative: Vec<String>,
    pub(crate) expires_in_minutes: Option<u32>,
}

pub(crate) fn draft(alert: &Alert, config: &SynthesisConfig) -> Draft {
    match alert.category {
        Category::Maintenance if is_battery(alert) => battery(alert, config),
        Category::Maintenance => equipment(alert, config),
        Category::Safety => safety(alert, config),
        Category::Inventory => inventory(alert),
        Category::Slotting => slotting(alert),
        Category::Labor => labor(alert),
        Category::General => general(alert),
    }
}

/// Metric projections for a template, before configuration overrides
#[must_use]
pub fn default_metrics(template: &str) -> Vec<ImpactMetric> {
    match template {
        "maintenance.battery" => vec![
            ImpactMetric::new("Robot Uptime", 92.0, 98.0, "%"),
            ImpactMetric::new("Battery Stoppages", 4.0, 1.0, "per shift"),
        ],
        "maintenance.equipment" => vec![
            ImpactMetric::new("Equipment Availability", 88.0, 95.0, "%"),
            ImpactMetric::new("Maintenance Cost", 1200.0, 950.0, "USD"),
        ],
        "safety" => vec![
            ImpactMetric::new("Incident Risk", 35.0, 10.0, "%"),
            ImpactMetric::new("Response Time", 12.0, 4.0, "min"),
        ],
        "inventory" => vec![
            ImpactMetric::new("Stock Level", 60.0, 85.0, "%"),
            ImpactMetric::new("Stockout Risk", 25.0, 5.0, "%"),
        ],
        "slotting" => vec![
            ImpactMetric::new("Pick Travel Distance", 120.0, 95.0, "m"),
            ImpactMetric::new("Picks per Hour", 85.0, 100.0, "picks/h"),
        ],
        "labor" => vec![
            ImpactMetric::new("Throughput", 400.0, 460.0, "units/h"),
            ImpactMetric::new("Overtime Cost", 2500.0, 1800.0, "USD"),
        ],
        _ => vec![ImpactMetric::new("Operational Efficiency", 80.0, 85.0, "%")],
    }
}

fn is_battery(alert: &Alert) -> bool {
    let text = format!("{} {}", alert.title, alert.description).to_lowercase();
    text.contains("battery") || text.contains("charge")
}

fn entity_list(alert: &Alert) -> String {
    if alert.affected_entities.is_empty() {
        "affected units".to_string()
    } else {
        alert.affected_entities.join(", ")
    }
}

fn battery(alert: &Alert, config: &SynthesisConfig) -> Draft {
    let destination = &config.charging_destination;
    let mut actions: Vec<Action> = alert
        .affected_entities
        .iter()
        .map(|robot| {
            Action::dispatch(
                robot.clone(),
                destination.clone(),
                "Battery below safe operating level",
            )
        })
        .collect();
    if actions.is_empty() {
        actions.push(Action::notify(
            "maintenance-team",
            "dashboard",
            format!("Low battery reported: {}", alert.title),
            alert.severity,
        ));
    }

    Draft {
        template: "maintenance.battery",
        title: format!("Send {} robot(s) to charging", alert.affected_entities.len().max(1)),
        description: format!(
            "Dispatch {} to {destination} before battery depletion interrupts operations.",
            entity_list(alert)
        ),
        actions,
        positive: vec![
            "Prevents unplanned robot shutdowns".into(),
            "Restores fleet availability".into(),
        ],
        negative: vec!["Picking capacity drops while robots charge".into()],
        expires_in_minutes: None,
    }
}

fn equipment(alert: &Alert, config: &SynthesisConfig) -> Draft {
    let destination = &config.maintenance_destination;
    let mut actions: Vec<Action> = alert
        .affected_entities
        .iter()
        .map(|unit| Action::dispatch(unit.clone(), destination.clone(), alert.title.clone()))
        .collect();
    actions.push(Action::notify(
        "maintenance-team",
        "pager",
        format!("Maintenance needed: {} ({})", alert.title, entity_list(alert)),
        alert.severity,
    ));

    Draft {
        template: "maintenance.equipment",
        title: format!("Schedule maintenance: {}", alert.title),
        description: format!(
            "Move {} to {destination} and page the maintenance team.",
            entity_list(alert)
        ),
        actions,
        positive: vec!["Avoids escalation into a breakdown".into()],
        negative: vec!["Units are out of service during maintenance".into()],
        expires_in_minutes: None,
    }
}

fn safety(alert: &Alert, config: &SynthesisConfig) -> Draft {
    let mut actions: Vec<Action> = if alert.affected_zones.is_empty() {
        alert.affected_entities.iter().map(|e| Action::camera(e.clone())).collect()
    } else {
        alert.affected_zones.iter().map(|z| Action::camera(z.clone())).collect()
    };
    if actions.is_empty() {
        actions.push(Action::camera("warehouse"));
    }
    actions.push(Action::notify(
        "safety-team",
        "pager",
        format!("Safety hazard: {}", alert.title),
        alert.severity.max(Severity::High),
    ));

    Draft {
        template: "safety",
        title: format!("Inspect safety hazard: {}", alert.title),
        description: "Focus cameras on the affected area and alert the safety team for \
                      immediate inspection."
            .into(),
        actions,
        positive: vec![
            "Shortens time to hazard confirmation".into(),
            "Reduces injury risk".into(),
        ],
        negative: vec!["Safety team is pulled from scheduled rounds".into()],
        expires_in_minutes: Some(config.safety_expiry_minutes),
    }
}

fn inventory(alert: &Alert) -> Draft {
    let mut actions = vec![Action::notify(
        "inventory-team",
        "dashboard",
        format!("Replenish {}: {}", entity_list(alert), alert.title),
        alert.severity,
    )];
    actions.extend(
        alert
            .affected_zones
            .iter()
            .map(|zone| Action::reallocate("replenishment-crew", zone.clone(), Vec::new())),
    );

    Draft {
        template: "inventory",
        title: format!("Replenish stock: {}", alert.title),
        description: format!("Prioritize replenishment of {}.", entity_list(alert)),
        actions,
        positive: vec!["Prevents stockouts on open orders".into()],
        negative: vec!["Replenishment competes with picking for labor".into()],
        expires_in_minutes: None,
    }
}

fn slotting(alert: &Alert) -> Draft {
    Draft {
        template: "slotting",
        title: format!("Re-slot items: {}", alert.title),
        description: format!(
            "Move {} to forward pick locations to cut travel distance.",
            entity_list(alert)
        ),
        actions: vec![Action::reallocate(
            "pick-slots",
            "forward-pick",
            alert.affected_entities.clone(),
        )],
        positive: vec!["Shorter pick paths".into()],
        negative: vec!["Re-slotting labor during the move".into()],
        expires_in_minutes: None,
    }
}

fn labor(alert: &Alert) -> Draft {
    let mut actions: Vec<Action> = if alert.affected_zones.is_empty() {
        vec![Action::reallocate(
            "floater-pool",
            "understaffed-area",
            alert.affected_entities.clone(),
        )]
    } else {
        alert
            .affected_zones
            .iter()
            .map(|zone| {
                Action::reallocate("workforce", zone.clone(), alert.affected_entities.clone())
            })
            .collect()
    };
    actions.push(Action::notify(
        "shift-supervisor",
        "dashboard",
        format!("Staffing adjustment: {}", alert.title),
        alert.severity,
    ));

    Draft {
        template: "labor",
        title: format!("Rebalance workforce: {}", alert.title),
        description: "Shift available workers to the constrained area and inform the supervisor."
            .into(),
        actions,
        positive: vec!["Restores throughput in the constrained area".into()],
        negative: vec!["Donor areas run with reduced staff".into()],
        expires_in_minutes: None,
    }
}

fn general(alert: &Alert) -> Draft {
    let mut actions = vec![Action::notify(
        "operations-team",
        "dashboard",
        format!("Review: {}", alert.title),
        alert.severity,
    )];
    actions.extend(alert.affected_zones.iter().map(|z| Action::camera(z.clone())));

    Draft {
        template: "general",
        title: format!("Review: {}", alert.title),
        description: "Bring the issue to the operations team's attention for manual review.".into(),
        actions,
        positive: vec!["Keeps operators informed".into()],
        negative: Vec::new(),
        expires_in_minutes: None,
    }
}
