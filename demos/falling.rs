use ape::*;

fn main() {
    let mut world = PhysicsWorld::new(WorldConfig {
        broadphase: BroadphaseKind::SweepAndPrune { axis: 1 },
        enable_timing: true,
        ..Default::default()
    })
    .expect("default config is valid");

    let ground = world
        .create_body(
            RigidBodyDesc::fixed(Vec3::new(0.0, -0.5, 0.0))
                .with_cuboid(Vec3::new(10.0, 0.5, 10.0))
                .with_material(Material::new(0.6, 0.5)),
        )
        .expect("ground");

    let balls: Vec<BodyHandle> = (0..5)
        .map(|i| {
            let desc = RigidBodyDesc::new(Vec3::new(0.05 * i as f32, 0.5 + i as f32, 0.0), Vec3::ZERO, 1.0)
                .with_material(Material::new(0.6, 0.5));
            world.create_body(desc).expect("ball")
        })
        .collect();

    println!("Inserted ground={} balls={:?}", ground, balls);

    for frame in 0..180 {
        world.step(1.0 / 60.0).expect("step");
        if frame % 30 == 29 {
            let stats = world.debug_stats();
            print!("t={:.2}s pairs={} contacts={}", (frame + 1) as f32 / 60.0, stats.candidate_pairs, stats.contacts);
            if let Some(t) = world.timing() {
                print!(
                    " step={:.3}ms (integrate={:.3} broad={:.3} narrow={:.3} solve={:.3})",
                    t.step_ms, t.integrate_ms, t.broadphase_ms, t.narrowphase_ms, t.solve_ms
                );
            }
            println!();
        }
    }

    for h in &balls {
        let b = world.body(*h).expect("ball is alive");
        println!(
            "{}: y={:.3} vy={:.3} sleeping={}",
            h, b.position.y, b.velocity.y, b.sleeping
        );
    }
}
