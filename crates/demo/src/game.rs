use glam::Vec3;
use log::{debug, info};
use replica::{
    ArgumentError, Args, Behaviour, BehaviourRegistry, CallContext, ComponentInfo, PrefabTable,
    Registrar, Transform, Value, ValueKind,
};

pub const GUNNER_PREFAB: usize = 0;
pub const TROPHY_PREFAB: usize = 1;

/// Player avatar. Kills are counted on the server and pushed to every peer.
#[derive(Debug, Default)]
pub struct Gunner {
    pub kills: i32,
    pub trophy_kills: i32,
    /// Trophies awarded so far. Only tracked where commands run.
    pub awarded: i32,
    pub feed: Vec<String>,
    pub milestones: Vec<i32>,
}

impl Gunner {
    fn new(trophy_kills: i32) -> Self {
        Self {
            trophy_kills,
            ..Default::default()
        }
    }
}

impl Behaviour for Gunner {
    fn name(&self) -> &str {
        "Gunner"
    }

    fn on_start(&mut self, info: &ComponentInfo) {
        debug!("Gunner {} ready (authority: {})", info.entity, info.has_authority);
    }

    fn on_sync_var_changed(&mut self, field: &str) {
        debug!("Gunner {} = {}", field, self.kills);
    }

    fn register(reg: &mut Registrar<'_, Self>) {
        reg.command("Fire", [ValueKind::Int], fire)
            .rpc("Announce", [ValueKind::String], |gunner, _, args| {
                gunner.feed.push(args.get(0)?);
                Ok(())
            })
            .target_rpc("Milestone", [ValueKind::Int], |gunner, ctx, args| {
                let kills: i32 = args.get(0)?;
                info!("{} reached {} kills", ctx.entity(), kills);
                gunner.milestones.push(kills);
                Ok(())
            })
            .sync_var("Kills", |gunner| &mut gunner.kills);
    }
}

fn fire(gunner: &mut Gunner, ctx: &mut CallContext, args: Args<'_>) -> Result<(), ArgumentError> {
    let hits: i32 = args.get(0)?;
    gunner.kills += hits.clamp(0, 3);
    ctx.send_sync_var("Kills");
    ctx.send_rpc("Announce", vec![Value::String(format!("{} fired", ctx.entity()))]);

    if gunner.trophy_kills > 0 && gunner.kills / gunner.trophy_kills > gunner.awarded {
        gunner.awarded += 1;
        ctx.reply("Milestone", vec![Value::Int(gunner.kills)]);
        let position = Vec3::new(gunner.awarded as f32, 0.0, 0.0);
        ctx.spawn(TROPHY_PREFAB, ctx.caller(), false, Transform::from_position(position));
    }
    Ok(())
}

/// Awarded to a gunner every time it passes a milestone.
#[derive(Debug, Default)]
pub struct Trophy;

impl Behaviour for Trophy {
    fn name(&self) -> &str {
        "Trophy"
    }

    fn on_start(&mut self, info: &ComponentInfo) {
        debug!("Trophy {} placed", info.entity);
    }
}

pub fn prefabs(trophy_kills: i32) -> PrefabTable {
    let mut prefabs = PrefabTable::new();
    prefabs.register("Gunner", move || -> Vec<Box<dyn Behaviour>> {
        vec![Box::new(Gunner::new(trophy_kills))]
    });
    prefabs.register("Trophy", || -> Vec<Box<dyn Behaviour>> { vec![Box::new(Trophy)] });
    prefabs
}

pub fn registry() -> BehaviourRegistry {
    let mut registry = BehaviourRegistry::new();
    registry.register::<Gunner>().register::<Trophy>();
    registry
}
