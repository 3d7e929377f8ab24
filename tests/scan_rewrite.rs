//! End-to-end rewrites of a lowered `dynamic_rnn` loop.

mod common;

use common::{RnnFixture, SEQUENCE_EXIT, STATE_EXIT, WHILE_SCOPE};
use prost::Message;
use rnn_scan_rewriter::builder::{build_graph, validate_graph};
use rnn_scan_rewriter::graph::GraphContext;
use rnn_scan_rewriter::prelude::*;
use rnn_scan_rewriter::rewriter::{adapt_scan_tensor, AdaptDirection, RewritePlan};

fn scan_node(graph: &GraphContext) -> &NodeProto {
    let mut scans = graph.nodes().filter(|n| n.op_type == "Scan");
    let scan = scans.next().expect("no Scan node");
    assert!(scans.next().is_none(), "more than one Scan node");
    scan
}

#[test]
fn test_dynamic_rnn_becomes_scan() {
    let (proto, region) = RnnFixture::default().build();
    let mut graph = GraphContext::new(&proto);
    let rewriter = CustomRnnRewriter::default();

    let mut context = rewriter.create_context(region);
    assert!(rewriter.need_rewrite(&mut context, &graph));
    assert_eq!(rewriter.rewrite(&context, &mut graph), RewriterResult::Ok);

    let scan = scan_node(&graph);
    assert!(scan.name.starts_with("custom_rnn_scan/Scan"));
    assert_eq!(scan.get_attribute_int("num_scan_inputs", 0), 1);
    assert_eq!(scan.input.len(), 3);
    assert_eq!(scan.input[0], "");
    assert_eq!(scan.output.len(), 2);
    for output in &scan.output {
        assert_eq!(graph.get_tensor_shape(output), Some(vec![1, 4]));
        assert_eq!(graph.get_tensor_elem_type(output), Some(1));
    }

    // initial values: the state first, then the sequence
    let h0 = graph.get_producer(&scan.input[1]).unwrap();
    let x = graph.get_producer(&scan.input[2]).unwrap();
    assert_eq!((h0.op_type.as_str(), h0.input[0].as_str()), ("Reshape", "h0"));
    assert_eq!((x.op_type.as_str(), x.input[0].as_str()), ("Reshape", "x"));
    assert_eq!(graph.get_tensor_shape(&scan.input[2]), Some(vec![1, 5, 4]));

    let body = scan.get_attribute_graph("body").unwrap();
    let inputs: Vec<_> = body.input.iter().map(|vi| vi.name.as_str()).collect();
    let outputs: Vec<_> = body.output.iter().map(|vi| vi.name.as_str()).collect();
    assert_eq!(inputs, vec!["rnn/while/Identity_2:0", "rnn/while/TensorArrayReadV3:0"]);
    assert_eq!(outputs, vec!["rnn/while/cell/Tanh:0", "rnn/while/cell/out:0"]);
    assert_eq!(body.node.len(), 4);
    assert_eq!(body.initializer[0].name, "rnn/kernel");

    assert!(!graph.has_node("rnn/while/Exit_2"));
    assert!(!graph.has_node("rnn/TensorArrayStack/TensorArrayGatherV3"));
}

#[test]
fn test_mismatched_accumulator_is_left_alone() {
    let fixture = RnnFixture {
        output_ta_name: "other/dynamic_rnn/output_0".to_string(),
        ..Default::default()
    };
    let (proto, region) = fixture.build();
    let mut graph = GraphContext::new(&proto);
    let before = graph.clone();
    let rewriter = CustomRnnRewriter::default();

    let mut context = rewriter.create_context(region);
    assert!(!rewriter.need_rewrite(&mut context, &graph));

    let report = LoopRewritePipeline::new(rewriter)
        .run(&mut graph, vec![fixture.region()])
        .unwrap();
    assert_eq!(report.skipped, vec![WHILE_SCOPE]);
    assert_eq!(report.nodes_pruned, 0);
    assert_eq!(graph.node_map, before.node_map);
    assert_eq!(graph.value_info_map, before.value_info_map);
}

#[test]
fn test_no_consumer_reads_removed_exits() {
    let (proto, region) = RnnFixture::default().build();
    let mut graph = GraphContext::new(&proto);

    let report = LoopRewritePipeline::new(CustomRnnRewriter::default())
        .run(&mut graph, vec![region])
        .unwrap();
    assert_eq!(report.rewritten, vec![WHILE_SCOPE]);
    assert!(report.nodes_pruned > 0);

    for node in graph.nodes() {
        assert!(
            !node.input.iter().any(|i| i == STATE_EXIT || i == SEQUENCE_EXIT),
            "{} still reads a removed exit",
            node.name
        );
    }

    let control_flow = ["Enter", "Merge", "Switch", "NextIteration", "Exit", "LoopCond"];
    assert!(graph.nodes().all(|n| !control_flow.contains(&n.op_type.as_str())));

    let h_final = graph.get_node("h_final").unwrap();
    let reshape = graph.get_producer(&h_final.input[0]).unwrap();
    assert_eq!(reshape.op_type, "Reshape");
    assert!(reshape.name.starts_with("state_output_reshape/"));
    assert_eq!(graph.get_tensor_shape(&h_final.input[0]), Some(vec![4]));

    let y_final = graph.get_node("y_final").unwrap();
    let reshape = graph.get_producer(&y_final.input[0]).unwrap();
    assert!(reshape.name.starts_with("scan_output_reshape/"));

    let rebuilt = build_graph(&graph);
    validate_graph(&rebuilt).unwrap();
    // h0 and x adapters, the scan, both output adapters, h_final, y_final
    assert_eq!(rebuilt.node.len(), 11);
    assert!(rebuilt.initializer.is_empty());
}

#[test]
fn test_graph_output_exit_keeps_its_name() {
    let fixture = RnnFixture {
        state_exit_is_graph_output: true,
        ..Default::default()
    };
    let (proto, region) = fixture.build();
    let mut graph = GraphContext::new(&proto);

    LoopRewritePipeline::new(CustomRnnRewriter::default())
        .run(&mut graph, vec![region])
        .unwrap();

    let bridge = graph.get_producer(STATE_EXIT).unwrap();
    assert_eq!(bridge.op_type, "Identity");
    let reshape = graph.get_producer(&bridge.input[0]).unwrap();
    assert_eq!(reshape.input[0], scan_node(&graph).output[0]);
    validate_graph(&build_graph(&graph)).unwrap();
}

#[test]
fn test_pipeline_continues_past_failing_region() {
    let fixture = RnnFixture::default();
    let (proto, region) = fixture.build();
    let mut broken = region.clone();
    broken.cell_graph.nodes.push("rnn/while/cell/gone".to_string());

    let mut graph = GraphContext::new(&proto);
    let report = LoopRewritePipeline::new(CustomRnnRewriter::default())
        .run(&mut graph, vec![broken, region])
        .unwrap();

    assert_eq!(report.failed, vec![WHILE_SCOPE]);
    assert_eq!(report.rewritten, vec![WHILE_SCOPE]);
    scan_node(&graph);
}

#[test]
fn test_failure_can_stop_the_pipeline() {
    let (proto, mut region) = RnnFixture::default().build();
    region.cell_graph.nodes.push("rnn/while/cell/gone".to_string());
    let mut graph = GraphContext::new(&proto);
    let before = graph.clone();

    let config = RewriteConfig::default().continue_on_error(false);
    let result = LoopRewritePipeline::new(CustomRnnRewriter::new(config.clone()))
        .with_config(config)
        .run(&mut graph, vec![region]);

    assert!(matches!(result, Err(TransformError::RewriteFailed { .. })));
    assert_eq!(graph.node_map, before.node_map);
}

#[test]
fn test_unresolved_sequence_shape_is_computed_at_runtime() {
    let fixture = RnnFixture {
        input_shape: vec![-1, -1, 4],
        ..Default::default()
    };
    let (proto, region) = fixture.build();
    let mut graph = GraphContext::new(&proto);

    LoopRewritePipeline::new(CustomRnnRewriter::default())
        .run(&mut graph, vec![region])
        .unwrap();

    let scan = scan_node(&graph);
    let reshape = graph.get_producer(&scan.input[2]).unwrap();
    let concat = graph.get_producer(&reshape.input[1]).unwrap();
    assert_eq!(concat.op_type, "Concat");
    let shape = graph.get_producer(&concat.input[1]).unwrap();
    assert_eq!((shape.op_type.as_str(), shape.input[0].as_str()), ("Shape", "x"));
    assert_eq!(graph.get_tensor_shape(&scan.input[2]), Some(vec![1, -1, -1, 4]));
}

#[test]
fn test_adaptation_round_trip_preserves_shape() {
    let proto = GraphProto {
        input: vec![rnn_scan_rewriter::proto::extensions::make_tensor_value_info(
            "x",
            1,
            &[-1, -1, 8],
        )],
        ..Default::default()
    };
    let graph = GraphContext::new(&proto);
    let mut plan = RewritePlan::new(&graph);

    let added = adapt_scan_tensor(&mut plan, &graph, "input", "x", AdaptDirection::Input).unwrap();
    let added = added.commit(&mut plan).unwrap();
    assert_eq!(plan.tensor_shape(&graph, &added), Some(vec![1, -1, -1, 8]));

    let removed = adapt_scan_tensor(&mut plan, &graph, "output", &added, AdaptDirection::Output).unwrap();
    assert_eq!(removed.op_types(), vec!["Shape", "Cast", "Slice", "Cast", "Reshape"]);
    let removed = removed.commit(&mut plan).unwrap();
    assert_eq!(plan.tensor_shape(&graph, &removed), Some(vec![-1, -1, 8]));

    let mut graph = graph;
    plan.apply(&mut graph).unwrap();
    assert_eq!(graph.get_tensor_shape(&removed), Some(vec![-1, -1, 8]));
}

#[test]
fn test_static_adaptation_round_trip_uses_constants() {
    let proto = GraphProto {
        input: vec![rnn_scan_rewriter::proto::extensions::make_tensor_value_info(
            "x",
            1,
            &[2, 5, 8],
        )],
        ..Default::default()
    };
    let mut graph = GraphContext::new(&proto);
    let mut plan = RewritePlan::new(&graph);

    let added = adapt_scan_tensor(&mut plan, &graph, "input", "x", AdaptDirection::Input).unwrap();
    assert_eq!(added.op_types(), vec!["Constant", "Reshape"]);
    let added = added.commit(&mut plan).unwrap();
    assert_eq!(plan.tensor_shape(&graph, &added), Some(vec![1, 2, 5, 8]));

    let removed = adapt_scan_tensor(&mut plan, &graph, "output", &added, AdaptDirection::Output).unwrap();
    assert_eq!(removed.op_types(), vec!["Constant", "Reshape"]);
    let removed = removed.commit(&mut plan).unwrap();

    plan.apply(&mut graph).unwrap();
    assert_eq!(graph.get_tensor_shape(&removed), Some(vec![2, 5, 8]));
    assert_eq!(graph.get_tensor_elem_type(&removed), Some(1));
}

#[test]
fn test_rewrite_model_round_trips_through_protobuf() {
    let (proto, region) = RnnFixture::default().build();
    let model = ModelProto {
        ir_version: 3,
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: 7,
        }],
        graph: Some(proto),
        ..Default::default()
    };

    let bytes = model.encode_to_vec();
    let decoded = ModelProto::decode(bytes.as_slice()).unwrap();
    let (rewritten, report) = rewrite_model(&decoded, vec![region], RewriteConfig::default()).unwrap();

    assert_eq!(report.rewritten.len(), 1);
    assert_eq!(rewritten.opset_import[0].version, 8);

    let graph = rewritten.graph.unwrap();
    validate_graph(&graph).unwrap();
    let outputs: Vec<_> = graph.output.iter().map(|vi| vi.name.as_str()).collect();
    assert_eq!(outputs, vec!["h_n", "y"]);
    // the scan comes after the reshapes feeding it
    let position = |op: &str| graph.node.iter().position(|n| n.op_type == op).unwrap();
    assert!(position("Reshape") < position("Scan"));
}
